//! Derive macros for the Fairdraw admission ledger
//!
//! This crate provides procedural macros that keep the ledger's command and
//! event enums free of hand-written `match` boilerplate.
//!
//! # Available Macros
//!
//! - `#[derive(Command)]` - Names command variants and marks privileged ones
//! - `#[derive(DomainEvent)]` - Generates versioned event type identifiers
//!
//! # Example
//!
//! ```ignore
//! use fairdraw_macros::{Command, DomainEvent};
//!
//! #[derive(Command, Clone, Debug)]
//! enum SaleCommand {
//!     #[privileged]
//!     ConfigureSale { stake: u64 },
//!
//!     EnterSale { value: u64 },
//! }
//!
//! assert_eq!(SaleCommand::EnterSale { value: 10 }.name(), "enter_sale");
//! assert!(SaleCommand::ConfigureSale { stake: 10 }.is_privileged());
//!
//! #[derive(DomainEvent, Clone, Debug)]
//! enum SaleEvent {
//!     SaleConfigured { stake: u64 },
//!     #[event(version = 2)]
//!     Entered { value: u64 },
//! }
//!
//! assert_eq!(SaleEvent::Entered { value: 10 }.event_type(), "Entered.v2");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{Attribute, Data, DataEnum, DeriveInput, Fields, LitInt, Variant, parse_macro_input};

/// Derive macro for command enums
///
/// Generates helper methods:
/// - `name()` - snake_case name of the variant, used as a metric and span label
/// - `is_privileged()` - true for variants marked `#[privileged]`
///
/// # Attributes
///
/// - `#[privileged]` - The command may only be submitted by the ledger controller
///
/// # Panics
///
/// This macro will produce a compile error (not a runtime panic) if it is
/// applied to a non-enum type.
#[proc_macro_derive(Command, attributes(privileged))]
pub fn derive_command(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;

    let Data::Enum(data_enum) = &input.data else {
        return syn::Error::new_spanned(input, "#[derive(Command)] can only be used on enums")
            .to_compile_error()
            .into();
    };

    let name_arms = data_enum.variants.iter().map(|variant| {
        let label = to_snake_case(&variant.ident.to_string());
        let pattern = variant_pattern(variant);
        quote! { #pattern => #label, }
    });

    let privileged: Vec<TokenStream2> = data_enum
        .variants
        .iter()
        .filter(|variant| has_attribute(&variant.attrs, "privileged"))
        .map(variant_pattern)
        .collect();

    let privileged_body = if privileged.is_empty() {
        quote! { false }
    } else {
        quote! { matches!(self, #(#privileged)|*) }
    };

    let expanded = quote! {
        impl #name {
            /// Returns the snake_case name of this command
            #[must_use]
            pub const fn name(&self) -> &'static str {
                match self {
                    #(#name_arms)*
                }
            }

            /// Returns true if only the ledger controller may submit this command
            #[must_use]
            pub const fn is_privileged(&self) -> bool {
                #privileged_body
            }
        }
    };

    TokenStream::from(expanded)
}

/// Derive macro for domain event enums
///
/// Generates `event_type()`, returning `"{Variant}.v{version}"`. The version
/// defaults to 1 and can be bumped per variant after a schema change.
///
/// # Attributes
///
/// - `#[event(version = N)]` - Override the schema version of a variant
///
/// # Panics
///
/// This macro will produce a compile error (not a runtime panic) if:
/// - Applied to a non-enum type
/// - The `version` argument is not an integer literal
#[proc_macro_derive(DomainEvent, attributes(event))]
pub fn derive_domain_event(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;

    let Data::Enum(data_enum) = &input.data else {
        return syn::Error::new_spanned(
            input,
            "#[derive(DomainEvent)] can only be used on enums",
        )
        .to_compile_error()
        .into();
    };

    match event_type_arms(data_enum) {
        Ok(arms) => {
            let expanded = quote! {
                impl #name {
                    /// Returns the versioned event type identifier
                    #[must_use]
                    pub const fn event_type(&self) -> &'static str {
                        match self {
                            #(#arms)*
                        }
                    }
                }
            };
            TokenStream::from(expanded)
        }
        Err(error) => error.to_compile_error().into(),
    }
}

fn event_type_arms(data_enum: &DataEnum) -> syn::Result<Vec<TokenStream2>> {
    data_enum
        .variants
        .iter()
        .map(|variant| {
            let version = event_version(&variant.attrs)?;
            let type_name = format!("{}.v{version}", variant.ident);
            let pattern = variant_pattern(variant);
            Ok(quote! { #pattern => #type_name, })
        })
        .collect()
}

/// Reads `#[event(version = N)]`, defaulting to 1
fn event_version(attrs: &[Attribute]) -> syn::Result<u32> {
    let mut version = 1;
    for attr in attrs.iter().filter(|attr| attr.path().is_ident("event")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("version") {
                let literal: LitInt = meta.value()?.parse()?;
                version = literal.base10_parse()?;
                Ok(())
            } else {
                Err(meta.error("unsupported event attribute, expected `version`"))
            }
        })?;
    }
    Ok(version)
}

fn variant_pattern(variant: &Variant) -> TokenStream2 {
    let ident = &variant.ident;
    match &variant.fields {
        Fields::Named(_) => quote! { Self::#ident { .. } },
        Fields::Unnamed(_) => quote! { Self::#ident(..) },
        Fields::Unit => quote! { Self::#ident },
    }
}

fn to_snake_case(ident: &str) -> String {
    let mut out = String::with_capacity(ident.len() + 4);
    for (i, ch) in ident.chars().enumerate() {
        if ch.is_ascii_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

/// Helper function to check if an attribute list contains a specific attribute
fn has_attribute(attrs: &[Attribute], name: &str) -> bool {
    attrs.iter().any(|attr| attr.path().is_ident(name))
}

#[cfg(test)]
mod tests {
    use super::to_snake_case;

    #[test]
    fn snake_case_splits_on_capitals() {
        assert_eq!(to_snake_case("RunLottery"), "run_lottery");
        assert_eq!(to_snake_case("Claim"), "claim");
        assert_eq!(to_snake_case("CheckIn"), "check_in");
    }
}
