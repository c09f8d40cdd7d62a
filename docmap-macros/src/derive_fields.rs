use crate::{
    prelude::*,
    utils::{extract_named_fields, stored_fields},
};
use syn::Generics;

pub fn derive_fields(item: TokenStream) -> Result<TokenStream> {
    let input = parse2::<DeriveInput>(item)?;

    let fields_named = extract_named_fields(input.span(), input.data)?;
    let fields = stored_fields(&input.attrs, fields_named)?;

    Ok(build_manifest(&input.ident, &input.generics, &fields))
}

/// `Fields` and `ToFieldValue` impls listing `fields` in declaration order.
pub fn build_manifest(ident: &Ident, generics: &Generics, fields: &[FieldConfig]) -> TokenStream {
    let krate = krate();
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let field_idents = fields.iter().map(|field| &field.ident);
    let field_names = fields.iter().map(|field| &field.name);

    let restore_identifier = fields.iter().find(|field| field.is_identifier()).map(|field| {
        let name = &field.name;
        quote! {
            if let ::std::option::Option::Some(id) =
                document.remove(#krate::projection::NESTED_ID_FIELD)
            {
                document.insert(#name, id);
            }
        }
    });
    let restore_fields = fields.iter().map(|field| {
        let name = &field.name;
        let ty = &field.ty;
        let restore = if field.is_identifier() {
            quote! { #krate::projection::restore_identifier::<#ty>(value) }
        } else {
            quote! { <#ty as #krate::fields::ToFieldValue>::restore_value(value) }
        };

        quote! {
            if let ::std::option::Option::Some(value) = document.get_mut(#name) {
                #restore;
            }
        }
    });

    quote! {
        impl #impl_generics #krate::fields::Fields for #ident #ty_generics #where_clause {
            fn fields(&self) -> ::std::vec::Vec<#krate::fields::Field<'_>> {
                ::std::vec![
                    #(
                        #krate::fields::Field::new(
                            #field_names,
                            #krate::fields::ToFieldValue::to_field_value(&self.#field_idents),
                        )
                    ),*
                ]
            }

            #[allow(unused_variables)]
            fn restore_document(document: &mut #krate::mongodb::bson::Document) {
                #restore_identifier
                #( #restore_fields )*
            }
        }

        impl #impl_generics #krate::fields::ToFieldValue for #ident #ty_generics #where_clause {
            fn to_field_value(&self) -> #krate::fields::FieldValue<'_> {
                #krate::fields::FieldValue::Composite(self)
            }

            fn restore_value(value: &mut #krate::mongodb::bson::Bson) {
                #krate::fields::restore_composite::<Self>(value);
            }
        }
    }
}
