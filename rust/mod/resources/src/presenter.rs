//! Where controllers send user-facing side effects.

/// Receives notifications, navigation and error banners.
///
/// Controllers never render anything themselves; a CLI prints, a test
/// records.
pub trait Presenter: Send + Sync {
    /// Confirmation of a completed write.
    fn notify(&self, message: &str);

    fn navigate(&self, route: &str);

    /// Non-field failure: forbidden action or backend error.
    fn error(&self, message: &str);
}
