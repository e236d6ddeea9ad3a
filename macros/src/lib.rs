//! Derive macros for fairsale
//!
//! # Available Macros
//!
//! - `#[derive(Action)]` - Generates helpers for action enums (commands/notifications)
//!
//! # Example
//!
//! ```ignore
//! use fairsale_macros::Action;
//!
//! #[derive(Action, Clone, Debug)]
//! enum PresaleAction {
//!     #[command]
//!     Deposit { amount: u64 },
//!
//!     #[command]
//!     #[admin]
//!     StartBallot,
//!
//!     #[event]
//!     PaymentDeposited { amount: u64 },
//! }
//!
//! assert!(PresaleAction::StartBallot.requires_admin());
//! assert_eq!(PresaleAction::PaymentDeposited { amount: 1 }.event_type(), "PaymentDeposited.v1");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, Attribute, Data, DeriveInput, Fields, Ident};

/// Derive macro for Action enums
///
/// Generates helper methods for action enums:
/// - `is_command()` - Returns true if this variant is a command
/// - `is_event()` - Returns true if this variant is a notification
/// - `requires_admin()` - Returns true if the command is administrator-only
/// - `event_type()` - Returns the versioned notification name
/// - `name()` - Returns the variant name, for logs and metric labels
///
/// # Attributes
///
/// - `#[command]` - Mark a variant as a command
/// - `#[event]` - Mark a variant as a notification
/// - `#[admin]` - Mark a command as administrator-only
///
/// # Errors
///
/// Produces a compile error if:
/// - Applied to a non-enum type
/// - A variant has both `#[command]` and `#[event]`
/// - `#[admin]` is placed on a variant that is not a `#[command]`
#[proc_macro_derive(Action, attributes(command, event, admin))]
pub fn derive_action(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;

    let Data::Enum(data_enum) = &input.data else {
        return syn::Error::new_spanned(input, "#[derive(Action)] can only be used on enums")
            .to_compile_error()
            .into();
    };

    let mut command_arms = Vec::new();
    let mut event_arms = Vec::new();
    let mut admin_arms = Vec::new();
    let mut event_type_arms = Vec::new();
    let mut name_arms = Vec::new();

    for variant in &data_enum.variants {
        let is_command = has_attribute(&variant.attrs, "command");
        let is_event = has_attribute(&variant.attrs, "event");
        let is_admin = has_attribute(&variant.attrs, "admin");

        if is_command && is_event {
            return syn::Error::new_spanned(variant, "Variant cannot be both #[command] and #[event]")
                .to_compile_error()
                .into();
        }

        if is_admin && !is_command {
            return syn::Error::new_spanned(variant, "#[admin] is only valid on #[command] variants")
                .to_compile_error()
                .into();
        }

        let pattern = variant_pattern(&variant.ident, &variant.fields);
        let variant_name = variant.ident.to_string();

        if is_command {
            command_arms.push(quote! { #pattern => true, });
        }
        if is_event {
            let type_name = format!("{variant_name}.v1");
            event_arms.push(quote! { #pattern => true, });
            event_type_arms.push(quote! { #pattern => #type_name, });
        }
        if is_admin {
            admin_arms.push(quote! { #pattern => true, });
        }
        name_arms.push(quote! { #pattern => #variant_name, });
    }

    let expanded = quote! {
        impl #name {
            /// Returns true if this action is a command
            #[must_use]
            pub const fn is_command(&self) -> bool {
                match self {
                    #(#command_arms)*
                    _ => false,
                }
            }

            /// Returns true if this action is a notification
            #[must_use]
            pub const fn is_event(&self) -> bool {
                match self {
                    #(#event_arms)*
                    _ => false,
                }
            }

            /// Returns true if only the administrator may issue this command
            #[must_use]
            pub const fn requires_admin(&self) -> bool {
                match self {
                    #(#admin_arms)*
                    _ => false,
                }
            }

            /// Returns the versioned notification name
            ///
            /// Only notifications have type names. Commands return "unknown".
            #[must_use]
            pub const fn event_type(&self) -> &'static str {
                match self {
                    #(#event_type_arms)*
                    _ => "unknown",
                }
            }

            /// Returns the variant name
            #[must_use]
            pub const fn name(&self) -> &'static str {
                match self {
                    #(#name_arms)*
                }
            }
        }
    };

    TokenStream::from(expanded)
}

/// Builds a match pattern that ignores the variant's fields
fn variant_pattern(variant: &Ident, fields: &Fields) -> TokenStream2 {
    match fields {
        Fields::Named(_) => quote! { Self::#variant { .. } },
        Fields::Unnamed(_) => quote! { Self::#variant(..) },
        Fields::Unit => quote! { Self::#variant },
    }
}

/// Helper function to check if an attribute list contains a specific attribute
fn has_attribute(attrs: &[Attribute], name: &str) -> bool {
    attrs.iter().any(|attr| attr.path().is_ident(name))
}
