//! Test dashboard builder

use fgk_riskreview::host::{Dashboard, LocalHost};
use fgk_riskreview::render::{RecordingRenderer, Renderer};
use fgk_riskreview::{InstanceId, MountTarget, PanelSettings};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Dashboard whose panels mount [`RecordingRenderer`]s the test can inspect.
pub struct TestDashboard {
    pub dashboard: Dashboard,
    renderers: Arc<Mutex<HashMap<String, RecordingRenderer>>>,
}

impl TestDashboard {
    pub fn new() -> Self {
        let renderers: Arc<Mutex<HashMap<String, RecordingRenderer>>> = Arc::default();
        let mounted = Arc::clone(&renderers);
        let factory = move |target: &MountTarget| -> Box<dyn Renderer> {
            let renderer = RecordingRenderer::new();
            mounted
                .lock()
                .unwrap()
                .insert(target.selector().to_string(), renderer.clone());
            Box::new(renderer)
        };
        let host = LocalHost::with_renderer_factory(factory);

        Self {
            dashboard: Dashboard::new(host),
            renderers,
        }
    }

    /// Add a panel mounted at `#<id>` with the given settings.
    pub fn with_panel(mut self, id: &str, settings: PanelSettings) -> Self {
        self.dashboard
            .add_panel(InstanceId::new(id), &mount(id), settings)
            .unwrap();
        self
    }

    /// Renderer mounted for panel `id`.
    pub fn renderer(&self, id: &str) -> RecordingRenderer {
        self.renderers
            .lock()
            .unwrap()
            .get(mount(id).selector())
            .cloned()
            .expect("no renderer mounted for panel")
    }
}

fn mount(id: &str) -> MountTarget {
    MountTarget::new(format!("#{}", id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dashboard_builder_mounts_renderers() {
        let test = TestDashboard::new().with_panel("a", PanelSettings::default());
        assert_eq!(test.renderer("a").calls().len(), 1);
    }
}
