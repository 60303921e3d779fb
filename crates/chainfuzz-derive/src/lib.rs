//! Chainfuzz Derive Macros: Fuzz Test Registration
//!
//! `#[fuzz_test]` turns a plain function into a registered
//! `chainfuzz::FuzzTest`. The parameter names after the context are
//! recorded so a worker can check them against the extras it knows how to
//! bind before the test runs.
//!
//! # Example
//!
//! ```ignore
//! use chainfuzz::prelude::*;
//!
//! #[fuzz_test]
//! fn fuzz_transfers(ctx: &mut FuzzContext, coverage: Option<CoverageProbe>) -> TestResult {
//!     let amount: u64 = ctx.rng().gen_range(0..1_000);
//!     ctx.watch("amount", amount);
//!     Ok(())
//! }
//!
//! // Generated next to the function:
//! // pub static FUZZ_TRANSFERS: ::chainfuzz::FuzzTest = ...;
//! ```

use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::{format_ident, quote};
use syn::{parse_macro_input, FnArg, Ident, ItemFn, Pat, Type};

/// Register a function as a fuzz test.
///
/// The first parameter is the `&mut FuzzContext` if its type is a mutable
/// reference; every other parameter is a named extra bound by name. The
/// function may return `()` or any `Result<(), E>` whose error converts
/// into a boxed error.
#[proc_macro_attribute]
pub fn fuzz_test(attr: TokenStream, item: TokenStream) -> TokenStream {
    let attr = TokenStream2::from(attr);
    if !attr.is_empty() {
        return syn::Error::new_spanned(attr, "#[fuzz_test] takes no arguments")
            .to_compile_error()
            .into();
    }
    let input = parse_macro_input!(item as ItemFn);
    match expand(&input) {
        Ok(tokens) => tokens.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

fn expand(input: &ItemFn) -> syn::Result<TokenStream2> {
    let sig = &input.sig;
    if let Some(asyncness) = &sig.asyncness {
        return Err(syn::Error::new_spanned(asyncness, "fuzz tests cannot be async"));
    }
    if !sig.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(&sig.generics, "fuzz tests cannot be generic"));
    }

    let fn_name = &sig.ident;
    let fn_vis = &input.vis;
    let test_name = fn_name.to_string();
    let static_name = Ident::new(&test_name.to_uppercase(), Span::call_site());

    let mut inputs = sig.inputs.iter().peekable();
    let takes_context = match inputs.peek() {
        Some(FnArg::Typed(arg)) => is_mut_reference(&arg.ty),
        Some(FnArg::Receiver(receiver)) => {
            return Err(syn::Error::new_spanned(receiver, "fuzz tests cannot be methods"))
        }
        None => false,
    };
    if takes_context {
        inputs.next();
    }

    let mut names = Vec::new();
    let mut bindings = Vec::new();
    let mut call_args = Vec::new();
    for (position, arg) in inputs.enumerate() {
        let FnArg::Typed(arg) = arg else {
            return Err(syn::Error::new_spanned(arg, "unexpected receiver"));
        };
        let Pat::Ident(pat) = arg.pat.as_ref() else {
            return Err(syn::Error::new_spanned(
                &arg.pat,
                "fuzz test parameters must be plain identifiers",
            ));
        };
        let name = pat.ident.to_string();
        let name = name.strip_prefix("r#").unwrap_or(&name).to_string();
        let ty = &arg.ty;
        let local = format_ident!("__chainfuzz_arg{}", position);
        bindings.push(quote! {
            let #local = args.take::<#ty>(#name)?;
        });
        call_args.push(quote! { #local });
        names.push(name);
    }

    let call = if takes_context {
        quote! { #fn_name(ctx, #(#call_args),*) }
    } else {
        quote! { #fn_name(#(#call_args),*) }
    };
    let doc = format!("Fuzz test registration for [`{test_name}`]");

    Ok(quote! {
        #input

        #[doc = #doc]
        #[allow(non_upper_case_globals)]
        #fn_vis static #static_name: ::chainfuzz::FuzzTest = ::chainfuzz::FuzzTest::new(
            ::core::module_path!(),
            #test_name,
            &[#(#names),*],
            {
                #[allow(unused_variables)]
                fn __chainfuzz_invoke(
                    ctx: &mut ::chainfuzz::FuzzContext,
                    args: &mut ::chainfuzz::TestArgs,
                ) -> ::chainfuzz::TestResult {
                    #(#bindings)*
                    ::chainfuzz::IntoTestResult::into_test_result(#call)
                }
                __chainfuzz_invoke
            },
        );
    })
}

fn is_mut_reference(ty: &Type) -> bool {
    matches!(ty, Type::Reference(reference) if reference.mutability.is_some())
}
