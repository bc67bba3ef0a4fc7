use proc_macro::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields, parse_macro_input, spanned::Spanned};

/// Derive the `Component` marker for a zero-payload tag.
///
/// Tags carry no value, so the derive rejects anything but a unit struct.
pub fn derive_tag(item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    let name = &input.ident;

    let is_unit = matches!(
        &input.data,
        Data::Struct(data) if matches!(data.fields, Fields::Unit)
    );
    if !is_unit {
        return syn::Error::new(
            input.span(),
            "Tag can only be derived for unit structs; a tag has no payload",
        )
        .to_compile_error()
        .into();
    }

    let expanded = quote! {
        impl ::hive_engine::ecs::component::Component for #name {
            const IS_TAG: bool = true;
        }
    };

    TokenStream::from(expanded)
}
