use crate::prelude::*;

pub fn derive_concept(item: TokenStream) -> Result<TokenStream> {
    let input = parse2::<DeriveInput>(item)?;

    if !input.generics.params.is_empty() {
        return Err(Error::new_spanned(
            &input.generics,
            "a concept can't be generic",
        ));
    }

    let Data::Struct(data_struct) = &input.data else {
        return Err(Error::new(input.span(), "expected struct"));
    };

    extract!(
        &data_struct.fields,
        Fields::Unnamed(fields_unnamed),
        "expected a tuple struct"
    );

    let Some(field) = fields_unnamed.unnamed.iter().exactly_one().ok() else {
        return Err(Error::new_spanned(
            fields_unnamed,
            "a concept wraps exactly one value",
        ));
    };

    let krate = krate();
    let ident = &input.ident;
    let inner = &field.ty;

    Ok(quote! {
        impl #krate::fields::Concept for #ident {
            type Value = #inner;

            fn concept_value(&self) -> &Self::Value {
                &self.0
            }
        }

        impl #krate::fields::ToFieldValue for #ident {
            fn to_field_value(&self) -> #krate::fields::FieldValue<'_> {
                #krate::fields::concept_field_value(self)
            }

            fn restore_value(value: &mut #krate::mongodb::bson::Bson) {
                <#inner as #krate::fields::ToFieldValue>::restore_value(value);
            }
        }

        impl ::std::ops::Deref for #ident {
            type Target = #inner;

            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl ::std::convert::AsRef<#inner> for #ident {
            fn as_ref(&self) -> &#inner {
                &self.0
            }
        }

        impl ::std::convert::From<#inner> for #ident {
            fn from(value: #inner) -> Self {
                Self(value)
            }
        }

        impl ::std::convert::From<#ident> for #inner {
            fn from(value: #ident) -> Self {
                value.0
            }
        }
    })
}
