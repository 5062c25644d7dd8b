pub mod calendar;
pub mod lifecycle;
pub mod notify;

pub use calendar::CalendarPush;
pub use lifecycle::LeaveService;
pub use notify::NotificationFanout;
