use proc_macro::TokenStream;
use quote::quote;
use syn::{
    parse_macro_input, AttributeArgs, FnArg, ItemFn, Lit, Meta, NestedMeta, Pat, ReturnType, Type,
};
use proc_macro_crate::{crate_name, FoundCrate};

/// Resolve host crate path (equivalent to `$crate`)
fn host_crate() -> proc_macro2::TokenStream {
    match crate_name("ragent") {
        Ok(FoundCrate::Itself) => quote!(crate),
        Ok(FoundCrate::Name(name)) => {
            let ident = syn::Ident::new(&name, proc_macro2::Span::call_site());
            quote!(::#ident)
        }
        Err(_) => quote!(::ragent),
    }
}

/// Turn a function taking a single `String` into a `Tool`.
///
/// ```ignore
/// #[tool(name = "Echo", description = "Repeat the input", input = "Text to repeat")]
/// fn echo(text: String) -> String { text }
/// ```
///
/// Generates `EchoTool`. The function may be `async` and may return either
/// `String` or `Result<String, E>` where `E: Display`; an `Err` becomes a
/// `ToolError::ExecutionError` so the agent reports it as a failed tool call.
#[proc_macro_attribute]
pub fn tool(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr as AttributeArgs);
    let input_fn = parse_macro_input!(item as ItemFn);

    let mut name_override = None;
    let mut description = None;
    let mut input_description = None;

    for nested in args {
        if let NestedMeta::Meta(Meta::NameValue(nv)) = nested {
            if let (Some(ident), Lit::Str(s)) = (nv.path.get_ident(), &nv.lit) {
                match ident.to_string().as_str() {
                    "name" => name_override = Some(s.value()),
                    "description" => description = Some(s.value()),
                    "input" => input_description = Some(s.value()),
                    other => {
                        return syn::Error::new_spanned(
                            ident,
                            format!("unknown tool attribute '{}'", other),
                        )
                        .to_compile_error()
                        .into();
                    }
                }
            }
        }
    }

    let description = match description {
        Some(d) => d,
        None => {
            return syn::Error::new_spanned(
                &input_fn.sig.ident,
                "tool requires `description = \"...\"`",
            )
            .to_compile_error()
            .into();
        }
    };

    let fn_ident = input_fn.sig.ident.clone();
    let fn_name = fn_ident.to_string();
    let tool_name = name_override.unwrap_or_else(|| fn_name.clone());

    if input_fn.sig.inputs.len() != 1 {
        return syn::Error::new_spanned(
            &input_fn.sig.inputs,
            "a tool function takes exactly one `String` argument",
        )
        .to_compile_error()
        .into();
    }

    let param_name = match input_fn.sig.inputs.first() {
        Some(FnArg::Typed(pt)) => {
            if !is_string(&pt.ty) {
                return syn::Error::new_spanned(&pt.ty, "the tool argument must be a `String`")
                    .to_compile_error()
                    .into();
            }
            match &*pt.pat {
                Pat::Ident(pi) => pi.ident.to_string(),
                other => {
                    return syn::Error::new_spanned(other, "only simple identifiers are supported")
                        .to_compile_error()
                        .into();
                }
            }
        }
        Some(arg @ FnArg::Receiver(_)) => {
            return syn::Error::new_spanned(arg, "methods with self are not supported")
                .to_compile_error()
                .into();
        }
        None => unreachable!("argument count checked above"),
    };

    let input_description = input_description.unwrap_or_else(|| param_name.clone());

    let tool_struct_ident =
        syn::Ident::new(&format!("{}Tool", pascal_case(&fn_name)), fn_ident.span());

    let host = host_crate();

    let call = if input_fn.sig.asyncness.is_some() {
        quote!(#fn_ident(input.to_string()).await)
    } else {
        quote!(#fn_ident(input.to_string()))
    };

    let run_body = if returns_result(&input_fn.sig.output) {
        quote! {
            #call.map_err(|e| #host::tools::error::ToolError::ExecutionError {
                name: #tool_name.to_string(),
                reason: e.to_string(),
            })
        }
    } else {
        quote!(Ok(#call))
    };

    let expanded = quote! {
        #input_fn

        pub struct #tool_struct_ident;

        #[#host::async_trait::async_trait]
        impl #host::tools::traits::Tool for #tool_struct_ident {
            fn name(&self) -> &str { #tool_name }
            fn description(&self) -> &str { #description }
            fn args(&self) -> Vec<#host::tools::traits::ArgSchema> {
                vec![#host::tools::traits::ArgSchema {
                    name: #param_name.into(),
                    arg_type: "string".into(),
                    description: #input_description.into(),
                    required: true,
                }]
            }
            async fn run(
                &self,
                input: &str,
            ) -> Result<String, #host::tools::error::ToolError> {
                #run_body
            }
        }
    };

    TokenStream::from(expanded)
}

fn pascal_case(s: &str) -> String {
    s.split('_')
        .map(|p| {
            let mut c = p.chars();
            match c.next() {
                None => String::new(),
                Some(f) => f.to_uppercase().collect::<String>() + c.as_str(),
            }
        })
        .collect::<Vec<_>>()
        .join("")
}

fn last_segment(ty: &Type) -> Option<String> {
    match ty {
        Type::Path(p) => p.path.segments.last().map(|s| s.ident.to_string()),
        _ => None,
    }
}

fn is_string(ty: &Type) -> bool {
    last_segment(ty).as_deref() == Some("String")
}

fn returns_result(output: &ReturnType) -> bool {
    match output {
        ReturnType::Type(_, ty) => last_segment(ty).as_deref() == Some("Result"),
        ReturnType::Default => false,
    }
}
