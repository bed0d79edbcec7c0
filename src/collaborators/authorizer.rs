//! Retrieval authorization driven by the configured verified callers

use std::collections::HashMap;

use log::debug;

use crate::collaborators::RetrievalAuthorizer;
use crate::config::VerifiedCaller;
use crate::metadata::{ListType, Sensitivity};

/// Verified callers see up to their configured tier.
///
/// `Classified` artefacts additionally need the list type to be granted.
#[derive(Debug, Clone, Default)]
pub struct VerifiedCallerAuthorizer {
    callers: HashMap<String, VerifiedCaller>,
}

impl VerifiedCallerAuthorizer {
    pub fn new(callers: &[VerifiedCaller]) -> Self {
        Self {
            callers: callers
                .iter()
                .map(|c| (c.caller_id.clone(), c.clone()))
                .collect(),
        }
    }
}

impl RetrievalAuthorizer for VerifiedCallerAuthorizer {
    fn is_authorised(&self, caller_id: &str, list_type: ListType, sensitivity: Sensitivity) -> bool {
        let Some(caller) = self.callers.get(caller_id) else {
            debug!("Caller {} is not verified", caller_id);
            return false;
        };
        if sensitivity > caller.max_sensitivity {
            return false;
        }
        match sensitivity {
            Sensitivity::Public | Sensitivity::Private => true,
            Sensitivity::Classified => caller.classified_list_types.contains(&list_type),
        }
    }
}
