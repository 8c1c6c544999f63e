use seniorcare_core::UserId;

/// Who is making the request, taken from the `x-user-id` header.
///
/// Absent for anonymous/system requests; audit stamps then carry no actor.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct ActorContext {
    user_id: Option<UserId>,
}

impl ActorContext {
    pub fn new(user_id: Option<UserId>) -> Self {
        Self { user_id }
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.user_id
    }
}
