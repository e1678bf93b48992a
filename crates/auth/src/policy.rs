//! Declarative action → rule tables.
//!
//! Tables are plain functions over the action enums, so every action of a kind
//! is matched exhaustively at compile time. A table returns `None` for an
//! action it deliberately does not register (e.g. approving a tab without its
//! shop), which the engine reports as an unknown action.

use tabkeep_core::UserId;

use crate::actions::{ShopAction, TabAction, UserAction};
use crate::roles::RoleMask;
use crate::target::{TabStatus, Target};

/// Composable decision predicate over `(subject, target)`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Rule {
    Allow,
    /// Subject is the target's owner.
    Owner,
    /// Subject holds every bit of the mask in the target's shop (owners hold all bits).
    Role(RoleMask),
    /// Subject is the shop owner or a confirmed member.
    Member,
    /// Subject is the user who opened the tab.
    TabOwner,
    TabIs(TabStatus),
    Any(&'static [Rule]),
    All(&'static [Rule]),
}

impl Rule {
    pub fn evaluate<T: Target>(&self, subject: UserId, target: &T) -> bool {
        match self {
            Rule::Allow => true,
            Rule::Owner => target.owner_id() == subject,
            Rule::Role(mask) => target
                .capabilities_of(subject)
                .is_some_and(|held| held.contains(*mask)),
            Rule::Member => target.capabilities_of(subject).is_some(),
            Rule::TabOwner => target.tab().is_some_and(|tab| tab.owner_id == subject),
            Rule::TabIs(status) => target.tab().is_some_and(|tab| tab.status == *status),
            Rule::Any(rules) => rules.iter().any(|r| r.evaluate(subject, target)),
            Rule::All(rules) => rules.iter().all(|r| r.evaluate(subject, target)),
        }
    }
}

/// One rule table per resource kind.
///
/// Built once as a process static and handed to the engine by reference.
#[derive(Debug)]
pub struct Policy {
    pub shop: fn(ShopAction) -> Option<Rule>,
    pub tab: fn(TabAction) -> Option<Rule>,
    pub tab_in_shop: fn(TabAction) -> Option<Rule>,
    pub user: fn(UserAction) -> Option<Rule>,
}

pub static DEFAULT_POLICY: Policy = Policy {
    shop: shop_rule,
    tab: tab_rule,
    tab_in_shop: tab_in_shop_rule,
    user: user_rule,
};

const MANAGE_ITEMS: Rule = Rule::Role(RoleMask::MANAGE_ITEMS);
const MANAGE_TABS: Rule = Rule::Role(RoleMask::MANAGE_TABS);
const MANAGE_LOCATIONS: Rule = Rule::Role(RoleMask::MANAGE_LOCATIONS);

const PENDING_TAB_OWNER: Rule = Rule::All(&[Rule::TabOwner, Rule::TabIs(TabStatus::Pending)]);

const TAB_READER: Rule = Rule::Any(&[Rule::TabOwner, Rule::Role(RoleMask::READ_TABS)]);

const TAB_UPDATER: Rule = Rule::Any(&[PENDING_TAB_OWNER, MANAGE_TABS]);

// Managing tabs covers orders outright; managing orders alone only while the tab is open.
const ORDER_MANAGER: Rule = Rule::Any(&[
    MANAGE_TABS,
    Rule::All(&[
        Rule::Role(RoleMask::MANAGE_ORDERS),
        Rule::TabIs(TabStatus::Active),
    ]),
]);

pub fn shop_rule(action: ShopAction) -> Option<Rule> {
    use ShopAction::*;

    let rule = match action {
        Read | ListItems | ListCategories | ListSubstitutionGroups | CreateTab => Rule::Allow,
        Update | Delete | InviteMember | RemoveMember | UpdateMemberRoles => Rule::Owner,
        ListMembers => Rule::Member,
        CreateItem | UpdateItem | DeleteItem | CreateCategory | UpdateCategory
        | DeleteCategory | CreateSubstitutionGroup | UpdateSubstitutionGroup
        | DeleteSubstitutionGroup => MANAGE_ITEMS,
        CreateLocation | UpdateLocation | DeleteLocation => MANAGE_LOCATIONS,
        ListTabs => Rule::Role(RoleMask::READ_TABS),
    };
    Some(rule)
}

pub fn tab_rule(action: TabAction) -> Option<Rule> {
    match action {
        TabAction::Read => Some(Rule::TabOwner),
        TabAction::Update => Some(PENDING_TAB_OWNER),
        TabAction::Approve
        | TabAction::Close
        | TabAction::Delete
        | TabAction::AddOrder
        | TabAction::UpdateOrder
        | TabAction::RemoveOrder => None,
    }
}

pub fn tab_in_shop_rule(action: TabAction) -> Option<Rule> {
    let rule = match action {
        TabAction::Read => TAB_READER,
        TabAction::Update => TAB_UPDATER,
        TabAction::Approve | TabAction::Close | TabAction::Delete => MANAGE_TABS,
        TabAction::AddOrder | TabAction::UpdateOrder | TabAction::RemoveOrder => ORDER_MANAGER,
    };
    Some(rule)
}

pub fn user_rule(action: UserAction) -> Option<Rule> {
    match action {
        UserAction::Read
        | UserAction::Update
        | UserAction::Delete
        | UserAction::ListShops
        | UserAction::ListTabs => Some(Rule::Owner),
    }
}
