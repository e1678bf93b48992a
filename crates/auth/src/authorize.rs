use thiserror::Error;

use tabkeep_core::AccessError;

use crate::actions::{ShopAction, TabAction, UserAction};
use crate::policy::{DEFAULT_POLICY, Policy};
use crate::principal::User;
use crate::target::{ResourceKind, Shop, Tab, TabInShop, Target};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    /// The action has no rule for this target kind. This is a programming
    /// error, never a security decision.
    #[error("unknown action '{action}' for {kind}")]
    UnknownAction { kind: ResourceKind, action: String },
}

impl From<AuthzError> for AccessError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::UnknownAction { kind, action } => {
                AccessError::UnknownAction(format!("{kind}:{action}"))
            }
        }
    }
}

/// Pure decision engine: `(subject, target, action) -> allowed`.
///
/// - No IO
/// - No panics
/// - Rules never fail; only an unregistered action is an error
#[derive(Debug, Clone, Copy)]
pub struct Authorizer {
    policy: &'static Policy,
}

impl Default for Authorizer {
    fn default() -> Self {
        Self::new(&DEFAULT_POLICY)
    }
}

impl Authorizer {
    pub fn new(policy: &'static Policy) -> Self {
        Self { policy }
    }

    /// Decide whether `subject` may perform `action` against `target`.
    pub fn authorize<T: Target>(
        &self,
        subject: &User,
        target: &T,
        action: T::Action,
    ) -> Result<bool, AuthzError> {
        let rule = T::rule(self.policy, action).ok_or_else(|| AuthzError::UnknownAction {
            kind: T::KIND,
            action: action.to_string(),
        })?;

        let allowed = rule.evaluate(subject.id, target);
        tracing::debug!(
            subject = %subject.id,
            kind = %T::KIND,
            action = %action,
            allowed,
            "authorization decision"
        );
        Ok(allowed)
    }

    pub fn authorize_shop_action(
        &self,
        subject: &User,
        shop: &Shop,
        action: ShopAction,
    ) -> Result<bool, AuthzError> {
        self.authorize(subject, shop, action)
    }

    pub fn authorize_tab_action(
        &self,
        subject: &User,
        tab: &Tab,
        action: TabAction,
    ) -> Result<bool, AuthzError> {
        self.authorize(subject, tab, action)
    }

    pub fn authorize_tab_in_shop_action(
        &self,
        subject: &User,
        target: &TabInShop,
        action: TabAction,
    ) -> Result<bool, AuthzError> {
        self.authorize(subject, target, action)
    }

    pub fn authorize_user_action(
        &self,
        subject: &User,
        user: &User,
        action: UserAction,
    ) -> Result<bool, AuthzError> {
        self.authorize(subject, user, action)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{Rule, shop_rule, tab_in_shop_rule, tab_rule};
    use crate::roles::RoleMask;
    use crate::target::{ShopMember, TabStatus};
    use tabkeep_core::{ShopId, TabId, UserId};

    fn user(name: &str) -> User {
        User::new(UserId::new(), format!("{name}@example.com"), name)
    }

    fn member(user: &User, roles: RoleMask) -> ShopMember {
        ShopMember {
            user_id: user.id,
            roles,
            confirmed: true,
        }
    }

    fn shop(owner: &User, members: Vec<ShopMember>) -> Shop {
        Shop {
            id: ShopId::new(),
            owner_id: owner.id,
            name: "Night Owl Bar".to_string(),
            members,
        }
    }

    fn tab_in(shop: &Shop, customer: &User, status: TabStatus) -> TabInShop {
        let tab = Tab {
            id: TabId::new(),
            shop_id: shop.id,
            owner_id: customer.id,
            status,
        };
        TabInShop::new(shop.clone(), tab).unwrap()
    }

    #[test]
    fn owner_bypasses_empty_role_bits() {
        let owner = user("owner");
        let staff = user("staff");
        let shop = shop(&owner, vec![member(&staff, RoleMask::NONE)]);
        let authz = Authorizer::default();

        assert!(authz.authorize_shop_action(&owner, &shop, ShopAction::Update).unwrap());
        assert!(!authz.authorize_shop_action(&staff, &shop, ShopAction::Update).unwrap());
    }

    #[test]
    fn item_manager_can_create_items_but_not_delete_shop() {
        let u1 = user("u1");
        let u2 = user("u2");
        let shop = shop(&u1, vec![member(&u2, RoleMask::from_bits(0b00001))]);
        let authz = Authorizer::default();

        assert!(authz.authorize_shop_action(&u2, &shop, ShopAction::CreateItem).unwrap());
        assert!(!authz.authorize_shop_action(&u2, &shop, ShopAction::Delete).unwrap());
    }

    #[test]
    fn reads_are_public() {
        let owner = user("owner");
        let stranger = user("stranger");
        let shop = shop(&owner, vec![]);
        let authz = Authorizer::default();

        for action in [ShopAction::Read, ShopAction::ListItems, ShopAction::ListCategories] {
            assert!(authz.authorize_shop_action(&stranger, &shop, action).unwrap());
        }
        assert!(!authz.authorize_shop_action(&stranger, &shop, ShopAction::ListTabs).unwrap());
        assert!(!authz.authorize_shop_action(&stranger, &shop, ShopAction::ListMembers).unwrap());
    }

    #[test]
    fn reading_tabs_requires_read_tabs_bit() {
        let owner = user("owner");
        let cashier = user("cashier");
        let cook = user("cook");
        let shop = shop(
            &owner,
            vec![
                member(&cashier, RoleMask::READ_TABS),
                member(&cook, RoleMask::MANAGE_ITEMS),
            ],
        );
        let authz = Authorizer::default();

        assert!(authz.authorize_shop_action(&cashier, &shop, ShopAction::ListTabs).unwrap());
        assert!(!authz.authorize_shop_action(&cook, &shop, ShopAction::ListTabs).unwrap());
    }

    #[test]
    fn unconfirmed_member_gets_nothing() {
        let owner = user("owner");
        let invited = user("invited");
        let mut pending = member(&invited, RoleMask::MANAGE_ITEMS);
        pending.confirmed = false;
        let shop = shop(&owner, vec![pending]);
        let authz = Authorizer::default();

        assert!(!authz.authorize_shop_action(&invited, &shop, ShopAction::CreateItem).unwrap());
        assert!(!authz.authorize_shop_action(&invited, &shop, ShopAction::ListMembers).unwrap());
    }

    #[test]
    fn order_manager_needs_active_tab_unless_tab_manager() {
        let owner = user("owner");
        let waiter = user("waiter");
        let manager = user("manager");
        let customer = user("customer");
        let shop = shop(
            &owner,
            vec![
                member(&waiter, RoleMask::MANAGE_ORDERS),
                member(&manager, RoleMask::MANAGE_ORDERS | RoleMask::MANAGE_TABS),
            ],
        );
        let authz = Authorizer::default();

        let pending = tab_in(&shop, &customer, TabStatus::Pending);
        let active = tab_in(&shop, &customer, TabStatus::Active);
        let closed = tab_in(&shop, &customer, TabStatus::Closed);

        assert!(
            !authz
                .authorize_tab_in_shop_action(&waiter, &pending, TabAction::AddOrder)
                .unwrap()
        );
        assert!(
            !authz
                .authorize_tab_in_shop_action(&waiter, &closed, TabAction::AddOrder)
                .unwrap()
        );
        assert!(authz.authorize_tab_in_shop_action(&waiter, &active, TabAction::AddOrder).unwrap());

        for target in [&pending, &active, &closed] {
            assert!(
                authz
                    .authorize_tab_in_shop_action(&manager, target, TabAction::AddOrder)
                    .unwrap()
            );
        }
    }

    #[test]
    fn tab_owner_may_update_only_while_pending() {
        let owner = user("owner");
        let customer = user("customer");
        let shop = shop(&owner, vec![]);
        let authz = Authorizer::default();

        let pending = tab_in(&shop, &customer, TabStatus::Pending);
        let active = tab_in(&shop, &customer, TabStatus::Active);

        assert!(
            authz
                .authorize_tab_in_shop_action(&customer, &pending, TabAction::Update)
                .unwrap()
        );
        assert!(
            !authz
                .authorize_tab_in_shop_action(&customer, &active, TabAction::Update)
                .unwrap()
        );
        assert!(
            !authz
                .authorize_tab_in_shop_action(&customer, &pending, TabAction::Approve)
                .unwrap()
        );

        // Shop owner acts regardless of tab state.
        assert!(authz.authorize_tab_in_shop_action(&owner, &active, TabAction::Update).unwrap());
        assert!(authz.authorize_tab_in_shop_action(&owner, &pending, TabAction::Approve).unwrap());
    }

    #[test]
    fn bare_tab_only_registers_self_service() {
        let customer = user("customer");
        let other = user("other");
        let tab = Tab {
            id: TabId::new(),
            shop_id: ShopId::new(),
            owner_id: customer.id,
            status: TabStatus::Pending,
        };
        let authz = Authorizer::default();

        assert!(authz.authorize_tab_action(&customer, &tab, TabAction::Read).unwrap());
        assert!(!authz.authorize_tab_action(&other, &tab, TabAction::Read).unwrap());
        assert!(authz.authorize_tab_action(&customer, &tab, TabAction::Update).unwrap());

        let err = authz
            .authorize_tab_action(&customer, &tab, TabAction::Approve)
            .unwrap_err();
        assert_eq!(
            err,
            AuthzError::UnknownAction {
                kind: ResourceKind::Tab,
                action: "tab.approve".to_string(),
            }
        );
    }

    #[test]
    fn users_may_only_manage_themselves() {
        let alice = user("alice");
        let bob = user("bob");
        let authz = Authorizer::default();

        assert!(authz.authorize_user_action(&alice, &alice, UserAction::Update).unwrap());
        assert!(!authz.authorize_user_action(&bob, &alice, UserAction::Update).unwrap());
    }

    fn deny_everything_shop(_: ShopAction) -> Option<Rule> {
        None
    }

    static SHOP_UNREGISTERED: Policy = Policy {
        shop: deny_everything_shop,
        tab: tab_rule,
        tab_in_shop: tab_in_shop_rule,
        user: crate::policy::user_rule,
    };

    #[test]
    fn unregistered_action_is_an_error_not_a_denial() {
        let owner = user("owner");
        let shop = shop(&owner, vec![]);
        let authz = Authorizer::new(&SHOP_UNREGISTERED);

        let err = authz
            .authorize_shop_action(&owner, &shop, ShopAction::Read)
            .unwrap_err();
        assert!(matches!(err, AuthzError::UnknownAction { kind: ResourceKind::Shop, .. }));

        let access: AccessError = err.into();
        assert_eq!(access, AccessError::UnknownAction("shop:shop.read".to_string()));
    }

    #[test]
    fn default_shop_table_registers_every_action() {
        for action in ShopAction::ALL {
            assert!(shop_rule(*action).is_some(), "{action} has no rule");
        }
        for action in TabAction::ALL {
            assert!(tab_in_shop_rule(*action).is_some(), "{action} has no rule");
        }
    }
}
