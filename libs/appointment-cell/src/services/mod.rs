pub mod booking;
pub mod lifecycle;
pub mod stats;

pub use booking::AppointmentBookingService;
pub use lifecycle::AppointmentLifecycleService;
