pub(crate) use crate::utils::{FieldConfig, extract, krate};
pub use darling::FromAttributes;
pub use heck::{
    ToKebabCase, ToLowerCamelCase, ToShoutyKebabCase, ToShoutySnakeCase, ToSnakeCase,
    ToUpperCamelCase,
};
pub use itertools::Itertools;
pub use proc_macro2::{Span, TokenStream};
pub use quote::quote;
pub use syn::{
    Attribute, Data, DeriveInput, Error, Expr, Field, Fields, FieldsNamed, Ident, LitStr,
    Result, Token, Type,
    ext::IdentExt,
    meta::ParseNestedMeta,
    parenthesized, parse2,
    spanned::Spanned,
    token,
};
