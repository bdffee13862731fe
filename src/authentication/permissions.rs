use crate::{jwt::SessionData, schema::UserRole};

const ACTION_TABLE: &[(UserRole, &[ActionType])] = &[
    (
        UserRole::User,
        &[
            ActionType::CreateRecipes,
            ActionType::ManageOwnRecipes,
            ActionType::ManageOwnLists,
            ActionType::ManageOwnSubscriptions,
        ],
    ),
    (
        UserRole::Admin,
        &[
            ActionType::CreateRecipes,
            ActionType::ManageOwnRecipes,
            ActionType::ManageOwnLists,
            ActionType::ManageOwnSubscriptions,
            ActionType::ManageAllRecipes,
        ],
    ),
];

#[derive(Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Clone, Copy)]
pub enum ActionType {
    CreateRecipes,

    ManageOwnRecipes,
    ManageOwnLists,
    ManageOwnSubscriptions,

    ManageAllRecipes,
}

impl ActionType {
    pub fn authenticate(self, session: &SessionData) -> bool {
        let role = &session.role;

        ACTION_TABLE
            .iter()
            .find_map(|(uid, actions)| {
                if role != uid {
                    return None;
                }

                Some(actions.contains(&self))
            })
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(role: UserRole) -> SessionData {
        SessionData {
            user_id: 1,
            role,
        }
    }

    #[test]
    fn users_manage_only_their_own_things() {
        let user = session(UserRole::User);

        assert!(ActionType::CreateRecipes.authenticate(&user));
        assert!(ActionType::ManageOwnLists.authenticate(&user));
        assert!(!ActionType::ManageAllRecipes.authenticate(&user));
    }

    #[test]
    fn admins_manage_every_recipe() {
        assert!(ActionType::ManageAllRecipes.authenticate(&session(UserRole::Admin)));
    }
}
