mod friends;
mod me;
mod message;
mod trip;
mod user;

pub use friends::FriendPair;
pub use friends::FriendRequest;
pub use friends::FriendRequestBuilder;
pub use friends::Friendship;
pub use friends::RequestStatus;
pub use me::Me;
pub use message::Message;
pub use trip::NewTrip;
pub use trip::Trip;
pub use trip::TripBuilder;
pub use trip::TripParticipant;
pub use user::NewUser;
pub use user::User;
