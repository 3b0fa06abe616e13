use super::{MemSource, global::Global, tracking::Tracking};

#[derive(Debug, Clone)]
pub struct TrackingOptions {
    byte_limit: Option<usize>,

    label: String,
}

impl Default for TrackingOptions {
    fn default() -> Self {
        Self {
            byte_limit: None,
            label: String::from("tracking"),
        }
    }
}

impl TrackingOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upper bound on live bytes; requests beyond it fail as exhausted.
    pub fn byte_limit(&mut self, limit: usize) -> &mut Self {
        self.byte_limit = Some(limit);
        self
    }

    /// Name attached to log events from this source.
    pub fn label(&mut self, label: impl Into<String>) -> &mut Self {
        self.label = label.into();
        self
    }

    pub fn build(&self) -> Tracking<Global> {
        self.build_on(Global)
    }

    pub fn build_on<S: MemSource>(&self, source: S) -> Tracking<S> {
        Tracking::from_parts(source, self.label.clone(), self.byte_limit)
    }
}
