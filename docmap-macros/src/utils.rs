use crate::prelude::*;
use proc_macro_crate::{FoundCrate, crate_name};

macro_rules! extract {
    ($val:expr, $pat:pat, $error_message: expr) => {
        let $pat = $val else {
            return Err(Error::new_spanned($val, $error_message));
        };
    };
}

pub(crate) use extract;

pub fn extract_named_fields(span: Span, data: Data) -> Result<FieldsNamed> {
    let Data::Struct(data_struct) = data else {
        return Err(Error::new(span, "expected struct"));
    };

    extract!(
        data_struct.fields,
        Fields::Named(named_fields),
        "expected named fields"
    );

    Ok(named_fields)
}

/// A struct field as it appears in the stored document.
pub struct FieldConfig {
    pub ident: Ident,
    pub ty: Type,
    pub name: LitStr,
}

impl FieldConfig {
    pub fn is_identifier(&self) -> bool {
        self.name.value().eq_ignore_ascii_case("id")
    }
}

/// Stored fields of a struct: serde renames applied, skipped fields left out.
pub fn stored_fields(attrs: &[Attribute], fields: FieldsNamed) -> Result<Vec<FieldConfig>> {
    let rename_all = parse_rename_all(attrs)?;

    let mut configs = vec![];

    for field in fields.named {
        let serde_field = parse_serde_field(&field)?;
        if serde_field.skip {
            continue;
        }

        extract!(&field.ident, Some(ident), "expected named field");
        let name = match (serde_field.rename, rename_all) {
            (Some(rename), _) => rename,
            (None, Some(rule)) => rule.apply(&ident.unraw().to_string()),
            (None, None) => ident.unraw().to_string(),
        };

        configs.push(FieldConfig {
            ident: ident.clone(),
            name: LitStr::new(&name, ident.span()),
            ty: field.ty,
        });
    }

    Ok(configs)
}

#[derive(Default)]
struct SerdeField {
    rename: Option<String>,
    skip: bool,
}

fn parse_serde_field(field: &Field) -> Result<SerdeField> {
    let mut serde_field = SerdeField::default();

    for attr in field.attrs.iter().filter(|attr| attr.path().is_ident("serde")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                if meta.input.peek(Token![=]) {
                    let value: LitStr = meta.value()?.parse()?;
                    serde_field.rename = Some(value.value());
                } else {
                    meta.parse_nested_meta(|nested| {
                        let value: LitStr = nested.value()?.parse()?;
                        if nested.path.is_ident("serialize") {
                            serde_field.rename = Some(value.value());
                        }
                        Ok(())
                    })?;
                }
            } else if meta.path.is_ident("skip") || meta.path.is_ident("skip_serializing") {
                serde_field.skip = true;
            } else {
                skip_meta_value(&meta)?;
            }

            Ok(())
        })?;
    }

    Ok(serde_field)
}

#[derive(Clone, Copy)]
enum RenameRule {
    Lower,
    Upper,
    Pascal,
    Camel,
    Snake,
    ScreamingSnake,
    Kebab,
    ScreamingKebab,
}

impl RenameRule {
    fn from_lit(lit: &LitStr) -> Result<Self> {
        let rule = match lit.value().as_str() {
            "lowercase" => Self::Lower,
            "UPPERCASE" => Self::Upper,
            "PascalCase" => Self::Pascal,
            "camelCase" => Self::Camel,
            "snake_case" => Self::Snake,
            "SCREAMING_SNAKE_CASE" => Self::ScreamingSnake,
            "kebab-case" => Self::Kebab,
            "SCREAMING-KEBAB-CASE" => Self::ScreamingKebab,
            _ => return Err(Error::new_spanned(lit, "unknown rename rule")),
        };

        Ok(rule)
    }

    fn apply(self, name: &str) -> String {
        match self {
            Self::Lower => name.to_ascii_lowercase(),
            Self::Upper => name.to_ascii_uppercase(),
            Self::Pascal => name.to_upper_camel_case(),
            Self::Camel => name.to_lower_camel_case(),
            Self::Snake => name.to_snake_case(),
            Self::ScreamingSnake => name.to_shouty_snake_case(),
            Self::Kebab => name.to_kebab_case(),
            Self::ScreamingKebab => name.to_shouty_kebab_case(),
        }
    }
}

fn parse_rename_all(attrs: &[Attribute]) -> Result<Option<RenameRule>> {
    let mut rule = None;

    for attr in attrs.iter().filter(|attr| attr.path().is_ident("serde")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename_all") && meta.input.peek(Token![=]) {
                let value: LitStr = meta.value()?.parse()?;
                rule = Some(RenameRule::from_lit(&value)?);
            } else {
                skip_meta_value(&meta)?;
            }

            Ok(())
        })?;
    }

    Ok(rule)
}

/// Consumes the value of a serde option docmap doesn't interpret.
fn skip_meta_value(meta: &ParseNestedMeta<'_>) -> Result<()> {
    if meta.input.peek(Token![=]) {
        meta.value()?.parse::<Expr>()?;
    } else if meta.input.peek(token::Paren) {
        let content;
        parenthesized!(content in meta.input);
        content.parse::<TokenStream>()?;
    }

    Ok(())
}

pub fn krate() -> TokenStream {
    match crate_name("docmap") {
        Ok(FoundCrate::Name(name)) => {
            let ident = Ident::new(&name, Span::call_site());
            quote! { ::#ident }
        }
        Ok(FoundCrate::Itself) | Err(_) => quote! { ::docmap },
    }
}
