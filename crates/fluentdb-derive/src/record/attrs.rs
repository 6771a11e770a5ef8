//! Attribute parsing for Record derive macro.
//!
//! Handles field-level `#[orm(...)]` attributes.

use syn::Result;

/// Parsed `#[orm(...)]` options of one field.
#[derive(Debug, Default)]
pub(super) struct FieldAttr {
    pub column: Option<String>,
    pub auto: bool,
    pub skip: bool,
    pub flatten: bool,
}

impl syn::parse::Parse for FieldAttr {
    fn parse(input: syn::parse::ParseStream) -> Result<Self> {
        let mut attr = FieldAttr::default();

        while !input.is_empty() {
            let ident: syn::Ident = input.parse()?;
            match ident.to_string().as_str() {
                "auto" => attr.auto = true,
                "skip" => attr.skip = true,
                "flatten" => attr.flatten = true,
                "column" => {
                    let _: syn::Token![=] = input.parse()?;
                    let value: syn::LitStr = input.parse()?;
                    attr.column = Some(value.value());
                }
                other => {
                    return Err(syn::Error::new(
                        ident.span(),
                        format!("unknown orm attribute `{other}`"),
                    ));
                }
            }

            if input.peek(syn::Token![,]) {
                let _: syn::Token![,] = input.parse()?;
            } else {
                break;
            }
        }

        Ok(attr)
    }
}

/// Merge every `#[orm(...)]` attribute on a field.
pub(super) fn get_field_attr(field: &syn::Field) -> Result<FieldAttr> {
    let mut merged = FieldAttr::default();
    for attr in &field.attrs {
        if !attr.path().is_ident("orm") {
            continue;
        }
        let parsed: FieldAttr = attr.parse_args()?;
        if parsed.column.is_some() {
            merged.column = parsed.column;
        }
        merged.auto |= parsed.auto;
        merged.skip |= parsed.skip;
        merged.flatten |= parsed.flatten;
    }
    Ok(merged)
}

/// The column a field maps to, or `None` when the field is not mapped.
///
/// Defaults to the field name; an explicit empty name means "skip".
pub(super) fn column_name(field: &syn::Field, attr: &FieldAttr) -> Option<String> {
    if attr.skip {
        return None;
    }
    match &attr.column {
        Some(name) if name.is_empty() => None,
        Some(name) => Some(name.clone()),
        None => field.ident.as_ref().map(|i| i.to_string()),
    }
}
