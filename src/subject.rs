//! Hot multicast: an observer and an observable in one.

pub mod publish_subject;
pub mod serialized;

pub use publish_subject::PublishSubject;
pub use serialized::SerializedSubject;
