//! Record extraction on top of a [`ModuleHost`].

use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use tracing::debug;

use crate::model::PluginRecord;
use crate::traits::{ClassInfo, MetadataExtractor, ModuleHost, PluginModule, AUDIO_EFFECT_CLASS};

/// Message recorded for modules that expose no classes at all.
pub const NO_CLASSES_MESSAGE: &str = "No plugin classes found";

/// [`MetadataExtractor`] that opens modules through a [`ModuleHost`] and
/// records the most representative class.
pub struct HostedExtractor<H: ModuleHost> {
    host: H,
}

impl<H: ModuleHost> HostedExtractor<H> {
    pub fn new(host: H) -> Self {
        Self { host }
    }

    fn extract_unguarded(&self, path: &str) -> PluginRecord {
        let module = match self.host.open(Path::new(path)) {
            Ok(module) => module,
            Err(e) => return PluginRecord::invalid(path, e.to_string()),
        };

        let classes = module.classes();
        match select_class(&classes) {
            Some(class) => {
                debug!(path, class = %class.name, category = %class.category, "Selected plugin class");
                PluginRecord::from_class(path, class)
            }
            None => PluginRecord::invalid(path, NO_CLASSES_MESSAGE),
        }
    }
}

impl<H: ModuleHost> MetadataExtractor for HostedExtractor<H> {
    fn extractor_name(&self) -> &str {
        "hosted"
    }

    fn extract(&self, path: &str) -> PluginRecord {
        // Hosting libraries run third-party code; a panic must not cross this boundary.
        panic::catch_unwind(AssertUnwindSafe(|| self.extract_unguarded(path))).unwrap_or_else(
            |payload| PluginRecord::invalid(path, panic_message(payload.as_ref())),
        )
    }
}

/// Picks the first audio effect class, falling back to the first class listed.
pub fn select_class(classes: &[ClassInfo]) -> Option<&ClassInfo> {
    classes
        .iter()
        .find(|c| c.category == AUDIO_EFFECT_CLASS)
        .or_else(|| classes.first())
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Module host panicked".to_string()
    }
}
