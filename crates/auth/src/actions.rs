//! Governed operations, one enum per resource kind.
//!
//! Actions are opaque tokens with a stable dotted name (e.g. `shop.update`).
//! Parsing a name that is not an action of the requested kind fails with
//! [`AuthzError::UnknownAction`].

use core::str::FromStr;

use crate::authorize::AuthzError;
use crate::target::ResourceKind;

macro_rules! actions {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:expr, {
            $($variant:ident => $token:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $token),+
                }
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = AuthzError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($token => Ok($name::$variant),)+
                    _ => Err(AuthzError::UnknownAction {
                        kind: $kind,
                        action: s.to_string(),
                    }),
                }
            }
        }
    };
}

actions!(
    /// Operations against a shop and its catalogue.
    ShopAction, ResourceKind::Shop, {
        Read => "shop.read",
        Update => "shop.update",
        Delete => "shop.delete",
        InviteMember => "shop.invite_member",
        RemoveMember => "shop.remove_member",
        UpdateMemberRoles => "shop.update_member_roles",
        ListMembers => "shop.list_members",
        ListItems => "shop.list_items",
        CreateItem => "shop.create_item",
        UpdateItem => "shop.update_item",
        DeleteItem => "shop.delete_item",
        ListCategories => "shop.list_categories",
        CreateCategory => "shop.create_category",
        UpdateCategory => "shop.update_category",
        DeleteCategory => "shop.delete_category",
        ListSubstitutionGroups => "shop.list_substitution_groups",
        CreateSubstitutionGroup => "shop.create_substitution_group",
        UpdateSubstitutionGroup => "shop.update_substitution_group",
        DeleteSubstitutionGroup => "shop.delete_substitution_group",
        CreateLocation => "shop.create_location",
        UpdateLocation => "shop.update_location",
        DeleteLocation => "shop.delete_location",
        ListTabs => "shop.list_tabs",
        CreateTab => "shop.create_tab",
    }
);

actions!(
    /// Operations against a tab, judged either on the tab alone or within its shop.
    TabAction, ResourceKind::Tab, {
        Read => "tab.read",
        Update => "tab.update",
        Approve => "tab.approve",
        Close => "tab.close",
        Delete => "tab.delete",
        AddOrder => "tab.add_order",
        UpdateOrder => "tab.update_order",
        RemoveOrder => "tab.remove_order",
    }
);

actions!(
    /// Self-service operations on a user account.
    UserAction, ResourceKind::User, {
        Read => "user.read",
        Update => "user.update",
        Delete => "user.delete",
        ListShops => "user.list_shops",
        ListTabs => "user.list_tabs",
    }
);
