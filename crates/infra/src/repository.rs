//! Typed persistence over a [`Store`].
//!
//! A write goes through, in order: the record's `normalize` hook, declarative
//! validation under the operation's groups, uniqueness lookups, audit
//! stamping, and finally the store.

use std::marker::PhantomData;
use std::sync::Arc;

use thiserror::Error;

use seniorcare_core::validation::{unique_checks, validate};
use seniorcare_core::{
    Audited, DomainError, EntityId, Group, Operations, Record, SpaceId, UserId, Validate,
    ValidationErrors,
};

use crate::audit::AuditListener;
use crate::store::{DeleteOutcome, Store, StoreError};

pub const ALREADY_USED: &str = "This value is already used.";

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl RepositoryError {
    fn not_found<R: Record>(id: EntityId) -> Self {
        RepositoryError::Store(StoreError::NotFound {
            table: R::TABLE.to_string(),
            id,
        })
    }
}

pub struct Repository<R> {
    store: Arc<dyn Store>,
    audit: AuditListener,
    _record: PhantomData<fn() -> R>,
}

impl<R> Clone for Repository<R> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            audit: self.audit.clone(),
            _record: PhantomData,
        }
    }
}

impl<R> Repository<R>
where
    R: Record + Validate + Operations + Audited,
{
    pub fn new(store: Arc<dyn Store>, audit: AuditListener) -> Self {
        Self {
            store,
            audit,
            _record: PhantomData,
        }
    }

    /// Persist a new record under its add group.
    pub async fn add(&self, actor: Option<UserId>, entity: R) -> Result<R, RepositoryError> {
        self.add_in(actor, entity, &R::add_groups()).await
    }

    /// Persist a new record validated under `groups`.
    pub async fn add_in(
        &self,
        actor: Option<UserId>,
        mut entity: R,
        groups: &[Group],
    ) -> Result<R, RepositoryError> {
        entity.normalize();
        validate(&entity, groups)?;
        self.check_unique(&entity, groups, None).await?;
        self.audit.on_insert(&mut entity, actor);
        let row = self.store.insert(R::TABLE, entity.to_row()?).await?;
        Ok(R::from_row(row)?)
    }

    /// Replace a stored record under its edit group.
    ///
    /// The stored creation stamp wins over whatever `entity` carries.
    pub async fn edit(&self, actor: Option<UserId>, entity: R) -> Result<R, RepositoryError> {
        self.replace(actor, entity, &R::edit_groups()).await
    }

    /// Load, mutate and [`edit`](Self::edit) in one step.
    pub async fn edit_with<F>(
        &self,
        actor: Option<UserId>,
        id: EntityId,
        change: F,
    ) -> Result<R, RepositoryError>
    where
        F: FnOnce(&mut R) -> Result<(), DomainError> + Send,
    {
        self.edit_in(actor, id, change, &R::edit_groups()).await
    }

    /// Load, mutate and store, validating only under `groups`.
    pub async fn edit_in<F>(
        &self,
        actor: Option<UserId>,
        id: EntityId,
        change: F,
        groups: &[Group],
    ) -> Result<R, RepositoryError>
    where
        F: FnOnce(&mut R) -> Result<(), DomainError> + Send,
    {
        let mut entity = self
            .get(id)
            .await?
            .ok_or_else(|| RepositoryError::not_found::<R>(id))?;
        change(&mut entity)?;
        self.replace(actor, entity, groups).await
    }

    async fn replace(
        &self,
        actor: Option<UserId>,
        mut entity: R,
        groups: &[Group],
    ) -> Result<R, RepositoryError> {
        let id = entity.record_id();
        let existing = self
            .get(id)
            .await?
            .ok_or_else(|| RepositoryError::not_found::<R>(id))?;
        let stored = existing.audit();
        let audit = entity.audit_mut();
        audit.created_at = stored.created_at;
        audit.created_by = stored.created_by;
        audit.updated_at = stored.updated_at;

        entity.normalize();
        validate(&entity, groups)?;
        self.check_unique(&entity, groups, Some(id)).await?;
        self.audit.on_update(&mut entity, actor);
        let row = self.store.update(R::TABLE, entity.to_row()?).await?;
        Ok(R::from_row(row)?)
    }

    pub async fn get(&self, id: EntityId) -> Result<Option<R>, RepositoryError> {
        match self.store.get(R::TABLE, id).await? {
            Some(row) => Ok(Some(R::from_row(row)?)),
            None => Ok(None),
        }
    }

    pub async fn remove(&self, id: EntityId) -> Result<DeleteOutcome, RepositoryError> {
        Ok(self.store.delete(R::TABLE, id).await?)
    }

    pub async fn list(&self, space: Option<SpaceId>) -> Result<Vec<R>, RepositoryError> {
        self.store
            .list(R::TABLE, space)
            .await?
            .into_iter()
            .map(|row| R::from_row(row).map_err(RepositoryError::from))
            .collect()
    }

    async fn check_unique(
        &self,
        entity: &R,
        groups: &[Group],
        exclude: Option<EntityId>,
    ) -> Result<(), RepositoryError> {
        let mut errors = ValidationErrors::new();
        for check in unique_checks(entity, groups) {
            if self
                .store
                .exists_with(R::TABLE, &check.columns, exclude)
                .await?
            {
                tracing::debug!(table = R::TABLE, field = check.field, "value already used");
                errors.add(check.field, ALREADY_USED);
            }
        }
        Ok(errors.into_result()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::ManualClock;
    use crate::store::InMemoryStore;
    use chrono::{Duration, NaiveDate, TimeZone, Utc};
    use seniorcare_core::{HasLifecycleState, LifecycleState};
    use seniorcare_entities::{
        Allergen, CareLevel, Contract, ContractFacilityOption, ContractType, DiningRoom, Facility,
        Gender, Resident, ResponsiblePersonRole, Space, CONTRACT_FACILITY_STATE,
    };

    struct Harness {
        store: Arc<InMemoryStore>,
        clock: Arc<ManualClock>,
        audit: AuditListener,
    }

    impl Harness {
        fn new() -> Self {
            let clock = Arc::new(ManualClock::new(
                Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap(),
            ));
            Self {
                store: Arc::new(InMemoryStore::standard()),
                audit: AuditListener::new(clock.clone()),
                clock,
            }
        }

        fn repo<R: Record + Validate + Operations + Audited>(&self) -> Repository<R> {
            Repository::new(self.store.clone(), self.audit.clone())
        }

        async fn space(&self) -> Space {
            self.repo::<Space>().add(None, Space::new("Sunrise")).await.unwrap()
        }
    }

    #[tokio::test]
    async fn titles_are_normalized_on_write() {
        let h = Harness::new();
        let space = h.space().await;
        let mut allergen = Allergen::new(space.id, "x");
        allergen.title = "Tree   nuts".into();

        let stored = h.repo::<Allergen>().add(None, allergen).await.unwrap();
        assert_eq!(stored.title, "Tree nuts");
    }

    #[tokio::test]
    async fn duplicate_title_reports_field_error() {
        let h = Harness::new();
        let space = h.space().await;
        let repo = h.repo::<Allergen>();
        repo.add(None, Allergen::new(space.id, "Peanuts")).await.unwrap();

        let err = repo
            .add(None, Allergen::new(space.id, "Peanuts"))
            .await
            .unwrap_err();
        match err {
            RepositoryError::Validation(errors) => {
                assert_eq!(errors.messages("title"), [ALREADY_USED.to_string()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn editing_keeps_its_own_title() {
        let h = Harness::new();
        let space = h.space().await;
        let repo = h.repo::<Allergen>();
        let mut stored = repo.add(None, Allergen::new(space.id, "Peanuts")).await.unwrap();
        stored.description = Some("Severe".into());
        let edited = repo.edit(None, stored).await.unwrap();
        assert_eq!(edited.description.as_deref(), Some("Severe"));
    }

    #[tokio::test]
    async fn blank_role_title_fails_only_under_add_group() {
        let h = Harness::new();
        let space = h.space().await;
        let repo = h.repo::<ResponsiblePersonRole>();

        let err = repo
            .add(None, ResponsiblePersonRole::new(space.id, "   "))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Validation(ref e) if e.contains("title")));

        repo.add_in(None, ResponsiblePersonRole::new(space.id, "   "), &[])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn audit_pair_is_stamped() {
        let h = Harness::new();
        let space = h.space().await;
        let repo = h.repo::<Allergen>();
        let creator = UserId::new();
        let editor = UserId::new();

        let stored = repo
            .add(Some(creator), Allergen::new(space.id, "Dust"))
            .await
            .unwrap();
        let created_at = stored.audit.created_at;
        assert!(created_at.is_some());

        h.clock.advance(Duration::minutes(5));
        let mut tampered = stored.clone();
        tampered.audit.created_by = Some(editor);
        tampered.audit.created_at = None;
        let edited = repo.edit(Some(editor), tampered).await.unwrap();

        assert_eq!(edited.audit.created_at, created_at);
        assert_eq!(edited.audit.created_by, Some(creator));
        assert_eq!(edited.audit.updated_by, Some(editor));
        assert!(edited.audit.updated_at > stored.audit.updated_at);
    }

    #[tokio::test]
    async fn edit_of_missing_record_is_not_found() {
        let h = Harness::new();
        let space = h.space().await;
        let err = h
            .repo::<Allergen>()
            .edit(None, Allergen::new(space.id, "Ghost"))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Store(StoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn option_state_changes_through_edit_with() {
        let h = Harness::new();
        let space = h.space().await;
        let birthday = NaiveDate::from_ymd_opt(1938, 6, 2).unwrap();
        let resident = h
            .repo::<Resident>()
            .add(None, Resident::new(space.id, "Anna", "Petrosyan", birthday, Gender::Female))
            .await
            .unwrap();
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let contract = h
            .repo::<Contract>()
            .add(None, Contract::new(resident.id, ContractType::Facility, start))
            .await
            .unwrap();

        let options = h.repo::<ContractFacilityOption>();
        let option = ContractFacilityOption::new(contract.id);
        assert_eq!(option.state(), LifecycleState::Active);
        let stored = options
            .add_in(None, option, &[])
            .await
            .unwrap();

        let changed = options
            .edit_with(None, stored.id, |o| {
                o.set_state(LifecycleState::Inactive);
                Ok(())
            })
            .await;
        // care level is required under the edit group
        assert!(matches!(changed, Err(RepositoryError::Validation(ref e)) if e.contains("care_level_id")));

        let outcome = h.repo::<Contract>().remove(contract.id).await.unwrap();
        assert_eq!(outcome.cascaded_from(ContractFacilityOption::TABLE), 1);
        assert!(options.get(stored.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn state_change_survives_deleted_care_level() {
        let h = Harness::new();
        let space = h.space().await;
        let facility = h
            .repo::<Facility>()
            .add(None, Facility::new(space.id, "Sunrise Manor", "SRM"))
            .await
            .unwrap();
        let dining_room = h
            .repo::<DiningRoom>()
            .add(None, DiningRoom::new(facility.id, "Main hall"))
            .await
            .unwrap();
        let care_level = h
            .repo::<CareLevel>()
            .add(None, CareLevel::new(space.id, "Assisted"))
            .await
            .unwrap();
        let birthday = NaiveDate::from_ymd_opt(1941, 3, 9).unwrap();
        let resident = h
            .repo::<Resident>()
            .add(None, Resident::new(space.id, "Hasmik", "Avetisyan", birthday, Gender::Female))
            .await
            .unwrap();
        let start = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        let contract = h
            .repo::<Contract>()
            .add(None, Contract::new(resident.id, ContractType::Facility, start))
            .await
            .unwrap();

        let options = h.repo::<ContractFacilityOption>();
        let mut option = ContractFacilityOption::new(contract.id);
        option.dining_room_id = Some(dining_room.id);
        option.care_level_id = Some(care_level.id);
        let stored = options.add(None, option).await.unwrap();

        let outcome = h.repo::<CareLevel>().remove(care_level.id).await.unwrap();
        assert_eq!(outcome.nulled_in(ContractFacilityOption::TABLE), 1);

        let state_only = [Group::from_static(CONTRACT_FACILITY_STATE)];
        let changed = options
            .edit_in(
                None,
                stored.id,
                |o| {
                    o.set_state(LifecycleState::Inactive);
                    Ok(())
                },
                &state_only,
            )
            .await
            .unwrap();
        assert_eq!(changed.state(), LifecycleState::Inactive);
        assert_eq!(changed.care_level_id, None);
        assert_eq!(changed.dining_room_id, Some(dining_room.id));

        // the full edit group still demands a care level
        let full = options
            .edit_with(None, stored.id, |o| {
                o.set_state(LifecycleState::Active);
                Ok(())
            })
            .await;
        assert!(matches!(full, Err(RepositoryError::Validation(ref e)) if e.contains("care_level_id")));
        let reloaded = options.get(stored.id).await.unwrap().unwrap();
        assert_eq!(reloaded.state(), LifecycleState::Inactive);
    }
}
