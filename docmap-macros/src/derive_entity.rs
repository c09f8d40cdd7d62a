use crate::{
    derive_fields::build_manifest,
    prelude::*,
    utils::{extract_named_fields, stored_fields},
};

#[derive(FromAttributes)]
#[darling(attributes(entity))]
struct Attributes {
    /// Discriminator stored with every document, the struct name by default.
    name: Option<String>,
}

pub fn derive_entity(item: TokenStream) -> Result<TokenStream> {
    let input = parse2::<DeriveInput>(item)?;

    let attributes = Attributes::from_attributes(&input.attrs)?;

    let fields_named = extract_named_fields(input.span(), input.data)?;
    let fields_span = fields_named.span();
    let fields = stored_fields(&input.attrs, fields_named)?;

    let id_fields = fields.iter().filter(|field| field.is_identifier()).collect_vec();
    let id_ty = match id_fields.as_slice() {
        [] => {
            return Err(Error::new(
                fields_span,
                "an entity must have an `id` field",
            ));
        }
        [field] => &field.ty,
        [_, field, ..] => {
            return Err(Error::new_spanned(
                &field.ident,
                "an entity must have exactly one `id` field",
            ));
        }
    };

    let type_name = LitStr::new(
        &attributes
            .name
            .unwrap_or_else(|| input.ident.to_string()),
        input.ident.span(),
    );

    let krate = krate();
    let ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let field_names = fields.iter().map(|field| &field.name).collect_vec();

    let manifest = build_manifest(ident, &input.generics, &fields);

    let registration = if input.generics.params.is_empty() {
        quote! {
            #krate::inventory::submit! {
                #krate::meta::EntityMetadataWrapper(
                    #krate::meta::EntityMetadata::new(#type_name, &[ #( #field_names ),* ])
                )
            }
        }
    } else {
        quote! {}
    };

    Ok(quote! {
        #manifest

        impl #impl_generics #krate::Entity for #ident #ty_generics #where_clause {
            type Id = #id_ty;

            const TYPE_NAME: &'static str = #type_name;

            const FIELD_NAMES: &'static [&'static str] = &[ #( #field_names ),* ];
        }

        #registration
    })
}
