pub mod booking;
pub mod progress;
pub mod role;
pub mod service;
pub mod transition;
pub mod user;
pub mod view;

pub use booking::{Booking, BookingFilter, BookingStatus, NewBooking};
pub use progress::Progress;
pub use role::{role_of, Role};
pub use service::{NewService, ServiceFilter, ServiceListing};
pub use transition::{available_transitions, Transition};
pub use user::User;
pub use view::BookingView;
