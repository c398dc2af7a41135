//! Handle construction seam.

/// Builds backend client handles for a [`ResourcePool`](super::ResourcePool).
///
/// `create` is called at most once per live key. A failure is returned to
/// the `acquire` caller unchanged.
pub trait HandleFactory: Send + Sync {
    type Handle: Send + Sync + 'static;
    type Error;

    fn create(&self, key: &str) -> Result<Self::Handle, Self::Error>;
}

impl<H, E, F> HandleFactory for F
where
    F: Fn(&str) -> Result<H, E> + Send + Sync,
    H: Send + Sync + 'static,
{
    type Handle = H;
    type Error = E;

    fn create(&self, key: &str) -> Result<H, E> {
        self(key)
    }
}
