//! Type helper utilities for syn type analysis.

/// Extract the single type argument of `Wrapper<T>` when the last path
/// segment is named `wrapper`.
fn single_arg<'a>(ty: &'a syn::Type, wrapper: &str) -> Option<&'a syn::Type> {
    let syn::Type::Path(type_path) = ty else {
        return None;
    };
    let seg = type_path.path.segments.last()?;
    if seg.ident != wrapper {
        return None;
    }
    let syn::PathArguments::AngleBracketed(args) = &seg.arguments else {
        return None;
    };
    if args.args.len() != 1 {
        return None;
    }
    let syn::GenericArgument::Type(inner) = args.args.first()? else {
        return None;
    };
    Some(inner)
}

/// Extract the inner type T from Option<T>, or return None if not an Option type.
///
/// Recognizes `Option<T>`, `std::option::Option<T>`, and `core::option::Option<T>`.
pub fn option_inner(ty: &syn::Type) -> Option<&syn::Type> {
    single_arg(ty, "Option")
}

/// Extract the inner type T from Box<T>, or return None if not a Box type.
pub fn box_inner(ty: &syn::Type) -> Option<&syn::Type> {
    single_arg(ty, "Box")
}

/// How an embedded record is held by its parent field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Embedding {
    /// `T`
    Plain,
    /// `Box<T>`
    Boxed,
    /// `Option<T>`
    Optional,
    /// `Option<Box<T>>`
    OptionalBoxed,
}

/// Classify a flattened field type, returning the embedded record type.
pub fn embedding(ty: &syn::Type) -> (Embedding, &syn::Type) {
    if let Some(inner) = option_inner(ty) {
        return match box_inner(inner) {
            Some(record) => (Embedding::OptionalBoxed, record),
            None => (Embedding::Optional, inner),
        };
    }
    match box_inner(ty) {
        Some(record) => (Embedding::Boxed, record),
        None => (Embedding::Plain, ty),
    }
}
