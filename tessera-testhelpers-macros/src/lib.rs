use unsynn::*;

keyword! {
    KFn = "fn";
}

unsynn! {
    // attributes, visibility and qualifiers before `fn`
    struct Prelude {
        items: Any<Cons<Except<KFn>, TokenTree>>,
    }

    // generics, parameters and return type
    struct Signature {
        items: Any<Cons<Except<BraceGroup>, TokenTree>>,
    }

    struct Body {
        items: BraceGroup,
    }

    struct TestFn {
        prelude: Prelude, _fn: KFn, name: Ident,
        signature: Signature, body: Body
    }
}

impl quote::ToTokens for Prelude {
    fn to_tokens(&self, tokens: &mut unsynn::TokenStream) {
        self.items.to_tokens(tokens)
    }
}

impl quote::ToTokens for Signature {
    fn to_tokens(&self, tokens: &mut unsynn::TokenStream) {
        self.items.to_tokens(tokens)
    }
}

impl quote::ToTokens for Body {
    fn to_tokens(&self, tokens: &mut unsynn::TokenStream) {
        tokens.extend(self.items.0.stream())
    }
}

/// Test attribute that installs the tessera test subscriber before the body runs.
///
/// Synchronous bodies run inside a `test` span named after the function, so
/// the events they log carry the test name.
///
/// ```ignore
/// use tessera_testhelpers::test;
///
/// #[test]
/// fn decodes_points() {
///     // TESSERA_LOG=tessera_json=trace shows per-field dispatch
/// }
/// ```
///
/// An argument replaces the inner test attribute, e.g.
/// `#[tessera_testhelpers::test(tokio::test)]`. An `async fn` needs one, since
/// the built-in harness cannot poll it.
#[proc_macro_attribute]
pub fn test(
    attr: proc_macro::TokenStream,
    item: proc_macro::TokenStream,
) -> proc_macro::TokenStream {
    let item = TokenStream::from(item);
    let mut tokens = item.to_token_iter();
    let TestFn {
        prelude,
        _fn,
        name,
        signature,
        body,
    } = match tokens.parse::<TestFn>() {
        Ok(decl) => decl,
        Err(_) => {
            return quote::quote! {
                ::core::compile_error!("#[tessera_testhelpers::test] expects a function");
            }
            .into();
        }
    };

    let is_async = quote::ToTokens::to_token_stream(&prelude)
        .into_iter()
        .any(|tt| matches!(tt, TokenTree::Ident(ref ident) if ident == "async"));

    if is_async && attr.is_empty() {
        return quote::quote! {
            ::core::compile_error!(
                "async tests need a runtime attribute, e.g. #[tessera_testhelpers::test(tokio::test)]"
            );
        }
        .into();
    }

    // span guards must not live across await points
    let enter = if is_async {
        quote::quote! { ::tessera_testhelpers::setup(); }
    } else {
        quote::quote! {
            let _test_span = ::tessera_testhelpers::enter_test(::core::stringify!(#name));
        }
    };

    let test_attr = if attr.is_empty() {
        quote::quote! { #[::core::prelude::rust_2024::test] }
    } else {
        let attr = TokenStream::from(attr);
        quote::quote! { #[#attr] }
    };

    quote::quote! {
        #test_attr
        #prelude fn #name #signature {
            #enter

            #body
        }
    }
    .into()
}
