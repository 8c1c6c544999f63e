//! Lookup of grid views by entity name.

use seniorcare_core::{GridView, Gridded};

use crate::{
    Allergen, Apartment, CareLevel, ContractApartmentOption, ContractFacilityOption, ContractRegionOption,
    Credit, DiningRoom, Discount, Expense, Facility, InsuranceCompany, Medication, PaymentType,
    Physician, Region, Resident, ResidentFacilityOption, ResponsiblePersonRole, Role,
    RpPaymentType, Salutation, Space, Speciality, User,
};

/// Entity names accepted by [`grid_views`].
pub const GRID_ENTITIES: &[&str] = &[
    "allergen",
    "apartment",
    "care_level",
    "contract_apartment_option",
    "contract_facility_option",
    "contract_region_option",
    "credit",
    "dining_room",
    "discount",
    "expense",
    "facility",
    "insurance_company",
    "medication",
    "payment_type",
    "physician",
    "region",
    "resident",
    "resident_facility_option",
    "responsible_person_role",
    "role",
    "rp_payment_type",
    "salutation",
    "space",
    "speciality",
    "user",
];

/// All grid views declared by `entity`, or `None` for an unknown name.
pub fn grid_views(entity: &str) -> Option<Vec<GridView>> {
    let views = match entity {
        "allergen" => Allergen::grid_views(),
        "apartment" => Apartment::grid_views(),
        "care_level" => CareLevel::grid_views(),
        "contract_apartment_option" => ContractApartmentOption::grid_views(),
        "contract_facility_option" => ContractFacilityOption::grid_views(),
        "contract_region_option" => ContractRegionOption::grid_views(),
        "credit" => Credit::grid_views(),
        "dining_room" => DiningRoom::grid_views(),
        "discount" => Discount::grid_views(),
        "expense" => Expense::grid_views(),
        "facility" => Facility::grid_views(),
        "insurance_company" => InsuranceCompany::grid_views(),
        "medication" => Medication::grid_views(),
        "payment_type" => PaymentType::grid_views(),
        "physician" => Physician::grid_views(),
        "region" => Region::grid_views(),
        "resident" => Resident::grid_views(),
        "resident_facility_option" => ResidentFacilityOption::grid_views(),
        "responsible_person_role" => ResponsiblePersonRole::grid_views(),
        "role" => Role::grid_views(),
        "rp_payment_type" => RpPaymentType::grid_views(),
        "salutation" => Salutation::grid_views(),
        "space" => Space::grid_views(),
        "speciality" => Speciality::grid_views(),
        "user" => User::grid_views(),
        _ => return None,
    };
    Some(views)
}

/// One named view of `entity`.
pub fn grid_view(entity: &str, view: &str) -> Option<GridView> {
    grid_views(entity)?.into_iter().find(|v| v.name == view)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_registered_entity_has_valid_views() {
        for entity in GRID_ENTITIES {
            let views = grid_views(entity).unwrap();
            assert!(!views.is_empty(), "{entity} declares no views");
            for view in views {
                view.validate().unwrap_or_else(|e| panic!("{entity}/{}: {e}", view.name));
                assert!(
                    view.space_column.is_some(),
                    "{entity}/{} is not scoped to a space",
                    view.name
                );
            }
        }
    }

    #[test]
    fn unknown_entity() {
        assert!(grid_views("invoice").is_none());
        assert!(grid_view("allergen", "missing").is_none());
        assert!(grid_view("allergen", "list").is_some());
    }
}
