pub mod ids;
pub mod itinerary;
pub mod money;
pub mod outcome;
pub mod response;
pub mod trip;

pub use ids::{ItineraryId, OwnerId};
pub use itinerary::{Activity, DaySequence, Itinerary, ItineraryDay};
pub use money::{parse_amount, read_amount, Amount, Cost};
pub use outcome::{PersistedItinerary, Rejection, RejectionReason};
pub use response::decode_structured;
pub use trip::{TravelPreferences, TripRequest, TripRequestBuilder};
