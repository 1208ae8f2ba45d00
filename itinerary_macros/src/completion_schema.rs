use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::quote;
use syn::{parse_macro_input, spanned::Spanned, ItemStruct, LitStr};

use crate::schema_extraction::{
    doc_text, ensure_named_struct, serialized_field_docs, CompletionSchemaArgs,
};

pub fn completion_schema(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = match CompletionSchemaArgs::parse(attr) {
        Ok(args) => args,
        Err(err) => return err.to_compile_error().into(),
    };

    let item_struct = parse_macro_input!(item as ItemStruct);

    if let Err(err) = ensure_named_struct(&item_struct) {
        return err.to_compile_error().into();
    }

    if !item_struct.generics.params.is_empty() {
        return syn::Error::new(
            item_struct.generics.span(),
            "`#[completion_schema]` does not support generic structs",
        )
        .to_compile_error()
        .into();
    }

    let schema_name = args
        .name
        .unwrap_or_else(|| LitStr::new(&item_struct.ident.to_string(), Span::call_site()));

    let description_tokens = match args
        .description
        .or_else(|| doc_text(&item_struct.attrs).map(|doc| LitStr::new(&doc, Span::call_site())))
    {
        Some(lit) => quote! { Some(#lit) },
        None => quote! { None },
    };

    let field_doc_tokens: Vec<_> = serialized_field_docs(&item_struct)
        .into_iter()
        .map(|(key, doc)| {
            let key = LitStr::new(&key, Span::call_site());
            let doc = LitStr::new(&doc, Span::call_site());
            quote! { (#key, #doc) }
        })
        .collect();

    let type_name = LitStr::new(&item_struct.ident.to_string(), Span::call_site());
    let ident = &item_struct.ident;

    let expanded = quote! {
        #item_struct

        impl itinerary_rs::schema::CompletionSchema for #ident {
            fn schema() -> &'static itinerary_rs::schema::SchemaHandle {
                static HANDLE: std::sync::OnceLock<itinerary_rs::schema::SchemaHandle> =
                    std::sync::OnceLock::new();
                HANDLE.get_or_init(|| {
                    let mut root = schemars::schema_for!(Self);
                    itinerary_rs::schema::apply_doc_comments(
                        &mut root,
                        #schema_name,
                        #description_tokens,
                        &[#(#field_doc_tokens),*],
                    );
                    itinerary_rs::schema::SchemaHandle::from_root_schema::<Self>(
                        #schema_name,
                        #type_name,
                        root,
                    )
                })
            }
        }
    };

    expanded.into()
}
