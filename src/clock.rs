/// Time source for the control loop.
///
/// Uptime drives publish throttling and retry deadlines; the wall clock
/// (synchronized once at startup, e.g. over SNTP) timestamps detections.
pub trait Clock {
    /// Milliseconds since boot. Monotonic.
    fn uptime_ms(&self) -> u64;

    /// Suspend the loop for `ms` milliseconds.
    fn delay_ms(&mut self, ms: u32);

    /// Seconds since the Unix epoch, or 0 while the wall clock is not
    /// synchronized.
    fn epoch_secs(&self) -> u32;
}
