//! Response descriptors handed back to the invocation boundary.
//!
//! | Outcome | Status | `location` | Body |
//! |---|---|---|---|
//! | Forbidden | 403 | none | `Forbidden key. The resolution may not be allowed` |
//! | Optimized (hit) | 301 | optimized URL | `Image already optimized` |
//! | Original (not an image) | 301 | master URL | `File is not an image. Redirecting to original` |
//! | Optimized (computed) | 301 | optimized URL | `Optimized image. Redirecting to optimized bucket` |
//! | Original (error) | 301 | master URL | `Something went wrong. Redirecting to original` |

use crate::coordinator::{OptimizedReason, OriginalReason, RoutingOutcome};
use crate::gateway::Links;
use serde::Serialize;
use std::collections::BTreeMap;

pub const STATUS_FORBIDDEN: u16 = 403;
pub const STATUS_REDIRECT: u16 = 301;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseDescriptor {
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl ResponseDescriptor {
    pub fn from_outcome(outcome: &RoutingOutcome, links: &Links) -> Self {
        match outcome {
            RoutingOutcome::Forbidden => Self {
                status_code: STATUS_FORBIDDEN,
                headers: BTreeMap::new(),
                body: "Forbidden key. The resolution may not be allowed".to_string(),
            },
            RoutingOutcome::RedirectToOptimized {
                optimized_key,
                reason,
            } => redirect(
                links.optimized(optimized_key),
                match reason {
                    OptimizedReason::AlreadyOptimized => "Image already optimized",
                    OptimizedReason::Optimized => {
                        "Optimized image. Redirecting to optimized bucket"
                    }
                },
            ),
            RoutingOutcome::RedirectToOriginal { master_key, reason } => redirect(
                links.master(master_key),
                match reason {
                    OriginalReason::NotAnImage => "File is not an image. Redirecting to original",
                    OriginalReason::Error => "Something went wrong. Redirecting to original",
                },
            ),
        }
    }

    pub fn location(&self) -> Option<&str> {
        self.headers.get("location").map(String::as_str)
    }
}

fn redirect(location: String, body: &str) -> ResponseDescriptor {
    ResponseDescriptor {
        status_code: STATUS_REDIRECT,
        headers: BTreeMap::from([("location".to_string(), location)]),
        body: body.to_string(),
    }
}
