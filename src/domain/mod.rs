mod consultation;
mod email_address;
mod origin_policy;

pub use consultation::{ConsultationPayload, ConsultationRequest, MAX_FIELD_LENGTH};
pub use email_address::EmailAddress;
pub use origin_policy::OriginPolicy;
