//! `seniorcare-entities`: the persistent entity model.
//!
//! Each entity declares its table, validation rules per operation group,
//! grid views and serialization projections on top of the conventions in
//! `seniorcare-core`.

#[macro_use]
mod macros;

pub mod care;
pub mod catalog;
pub mod contract;
pub mod facility;
pub mod oauth;
pub mod physician;
pub mod registry;
pub mod resident;
pub mod space;
pub mod user;

pub use care::CareFlags;
pub use catalog::{
    Allergen, CareLevel, Credit, Discount, Expense, InsuranceCompany, Medication, PaymentType,
    ResponsiblePersonRole, RpPaymentType, Salutation, Speciality,
};
pub use contract::{
    CONTRACT_FACILITY_STATE, Contract, ContractApartmentOption, ContractFacilityOption,
    ContractRegionOption, ContractType,
};
pub use facility::{Apartment, ApartmentRoom, DiningRoom, Facility, Region};
pub use oauth::{AccessToken, RefreshToken, TokenFields};
pub use physician::{Phone, PhoneCompatibility, PhoneKind, Physician, PhysicianPhone};
pub use resident::{
    Gender, Resident, ResidentAllergen, ResidentApartmentOption, ResidentFacilityOption,
    ResidentMedication, ResidentRegionOption,
};
pub use space::Space;
pub use user::{Role, User, UserRole};
