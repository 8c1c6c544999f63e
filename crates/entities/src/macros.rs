//! Trait wiring shared by entity types.

/// Implement `Entity` + `Record` for a struct with an `id: EntityId` field.
///
/// Optional `space: <field>` marks the record tenant-scoped and optional
/// `title: <field>` makes the write hook normalize that field.
macro_rules! impl_record {
    ($t:ty, $table:literal $(, space: $space:ident)? $(, title: $title:ident)?) => {
        impl seniorcare_core::Entity for $t {
            type Id = seniorcare_core::EntityId;

            fn id(&self) -> &Self::Id {
                &self.id
            }
        }

        impl seniorcare_core::Record for $t {
            const TABLE: &'static str = $table;

            fn record_id(&self) -> seniorcare_core::EntityId {
                self.id
            }

            $(
                fn record_space(&self) -> Option<seniorcare_core::SpaceId> {
                    Some(self.$space)
                }
            )?

            $(
                fn normalize(&mut self) {
                    self.$title = seniorcare_core::normalize_title(&self.$title);
                }
            )?
        }

        $(
            impl seniorcare_core::SpaceScoped for $t {
                fn space_id(&self) -> seniorcare_core::SpaceId {
                    self.$space
                }
            }
        )?

        $(
            impl seniorcare_core::Titled for $t {
                fn title(&self) -> &str {
                    &self.$title
                }

                fn set_title_raw(&mut self, title: String) {
                    self.$title = title;
                }
            }
        )?
    };
}

/// Implement `Audited` for a struct with an `audit: Audit` field.
macro_rules! impl_audited {
    ($($t:ty),+ $(,)?) => {
        $(
            impl seniorcare_core::Audited for $t {
                fn audit(&self) -> &seniorcare_core::Audit {
                    &self.audit
                }

                fn audit_mut(&mut self) -> &mut seniorcare_core::Audit {
                    &mut self.audit
                }
            }
        )+
    };
}

/// Implement `HasLifecycleState` for a struct with a `state` field.
macro_rules! impl_lifecycle {
    ($($t:ty),+ $(,)?) => {
        $(
            impl seniorcare_core::HasLifecycleState for $t {
                fn state(&self) -> seniorcare_core::LifecycleState {
                    self.state
                }

                fn set_state(&mut self, state: seniorcare_core::LifecycleState) {
                    self.state = state;
                }
            }
        )+
    };
}

/// Implement `Operations` from an add/edit group pair.
macro_rules! impl_operations {
    ($t:ty, $add:expr, $edit:expr) => {
        impl seniorcare_core::Operations for $t {
            const ADD: &'static str = $add;
            const EDIT: &'static str = $edit;
        }
    };
}

/// Integer-coded enum: `code()`, `ALL`, and `i16` conversions so serde can
/// store the enum as its code.
macro_rules! impl_coded {
    ($t:ident, $what:literal, { $($variant:ident = $code:literal),+ $(,)? }) => {
        impl $t {
            pub const ALL: &'static [$t] = &[$($t::$variant),+];
            pub const CODES: &'static [i64] = &[$($code),+];

            pub fn code(self) -> i16 {
                self as i16
            }
        }

        impl TryFrom<i16> for $t {
            type Error = seniorcare_core::DomainError;

            fn try_from(code: i16) -> Result<Self, Self::Error> {
                match code {
                    $($code => Ok($t::$variant),)+
                    other => Err(seniorcare_core::DomainError::validation(format!(
                        concat!("unknown ", $what, " code: {}"),
                        other
                    ))),
                }
            }
        }

        impl From<$t> for i16 {
            fn from(value: $t) -> Self {
                value.code()
            }
        }
    };
}
