//! Type helper utilities for syn type analysis.

/// The single type argument of `ty` when its last path segment is `wrapper`.
fn generic_inner<'a>(ty: &'a syn::Type, wrapper: &str) -> Option<&'a syn::Type> {
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
    generic_inner(ty, "Option")
}

/// Extract the inner type T from Box<T>.
pub fn box_inner(ty: &syn::Type) -> Option<&syn::Type> {
    generic_inner(ty, "Box")
}

/// How a nested record is held by its parent field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Holder {
    Plain,
    Option,
    Boxed,
    OptionBox,
}

/// Classify a field type as a nested-record holder.
pub fn holder_of(ty: &syn::Type) -> Holder {
    match option_inner(ty) {
        Some(inner) if box_inner(inner).is_some() => Holder::OptionBox,
        Some(_) => Holder::Option,
        None if box_inner(ty).is_some() => Holder::Boxed,
        None => Holder::Plain,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn test_option_inner() {
        let ty: syn::Type = parse_quote!(Option<String>);
        assert!(option_inner(&ty).is_some());

        let ty: syn::Type = parse_quote!(std::option::Option<i32>);
        assert!(option_inner(&ty).is_some());

        let ty: syn::Type = parse_quote!(Vec<String>);
        assert!(option_inner(&ty).is_none());
    }

    #[test]
    fn test_holder_of() {
        let ty: syn::Type = parse_quote!(Group);
        assert_eq!(holder_of(&ty), Holder::Plain);

        let ty: syn::Type = parse_quote!(Option<Group>);
        assert_eq!(holder_of(&ty), Holder::Option);

        let ty: syn::Type = parse_quote!(Box<Category>);
        assert_eq!(holder_of(&ty), Holder::Boxed);

        let ty: syn::Type = parse_quote!(Option<Box<Category>>);
        assert_eq!(holder_of(&ty), Holder::OptionBox);
    }
}
