#[warn(clippy::pedantic)]
mod derive_concept;
mod derive_entity;
mod derive_fields;
mod prelude;
mod utils;

fn expand<F: FnOnce(proc_macro2::TokenStream) -> syn::Result<proc_macro2::TokenStream>>(
    fun: F,
    input: proc_macro::TokenStream,
) -> proc_macro::TokenStream {
    fun(input.into())
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/// Derives `Entity` together with its field manifest.
///
/// The struct must have exactly one field stored as `id` (any case). The discriminator
/// defaults to the struct name and can be set with `#[entity(name = "...")]`.
#[proc_macro_derive(Entity, attributes(entity))]
pub fn entity(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    expand(derive_entity::derive_entity, input)
}

/// Derives the field manifest of a nested type.
#[proc_macro_derive(Fields)]
pub fn fields(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    expand(derive_fields::derive_fields, input)
}

/// Derives `Concept` for a single-field tuple struct, plus conversions to and from the
/// wrapped value.
#[proc_macro_derive(Concept)]
pub fn concept(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    expand(derive_concept::derive_concept, input)
}
