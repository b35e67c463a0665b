/// Coalesces render requests: any number of requests between two frames
/// produce a single render.
#[derive(Debug, Default)]
pub struct RedrawScheduler {
    dirty: bool,
}

impl RedrawScheduler {
    pub fn request(&mut self) {
        self.dirty = true;
    }

    pub fn is_pending(&self) -> bool {
        self.dirty
    }

    /// Returns whether a render was requested and clears the request.
    pub fn take(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }
}
