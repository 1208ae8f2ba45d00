use syn::{
    parse::Parser, punctuated::Punctuated, spanned::Spanned, Attribute, Expr, ExprLit, Field,
    Fields, ItemStruct, Lit, LitStr, MetaNameValue, Token,
};

#[derive(Default)]
pub struct CompletionSchemaArgs {
    pub name: Option<LitStr>,
    pub description: Option<LitStr>,
}

impl CompletionSchemaArgs {
    pub fn parse(attr: proc_macro::TokenStream) -> syn::Result<Self> {
        let mut result = Self::default();
        if attr.is_empty() {
            return Ok(result);
        }

        let args = Punctuated::<MetaNameValue, Token![,]>::parse_terminated.parse(attr)?;
        for arg in args {
            let lit = match &arg.value {
                Expr::Lit(ExprLit {
                    lit: Lit::Str(lit), ..
                }) => lit.clone(),
                other => {
                    return Err(syn::Error::new_spanned(
                        other,
                        "expected string literal value",
                    ))
                }
            };

            let slot = if arg.path.is_ident("name") {
                &mut result.name
            } else if arg.path.is_ident("description") {
                &mut result.description
            } else {
                return Err(syn::Error::new_spanned(
                    &arg.path,
                    "unsupported argument, expected `name` or `description`",
                ));
            };

            if slot.replace(lit).is_some() {
                return Err(syn::Error::new(arg.path.span(), "duplicate argument"));
            }
        }

        Ok(result)
    }
}

pub fn ensure_named_struct(item: &ItemStruct) -> syn::Result<()> {
    match &item.fields {
        Fields::Named(_) => Ok(()),
        _ => Err(syn::Error::new(
            item.struct_token.span(),
            "`#[completion_schema]` only supports structs with named fields",
        )),
    }
}

/// Joined `///` lines, or `None` when the item is undocumented.
pub fn doc_text(attrs: &[Attribute]) -> Option<String> {
    let lines: Vec<String> = attrs
        .iter()
        .filter(|attr| attr.path().is_ident("doc"))
        .filter_map(|attr| match &attr.meta {
            syn::Meta::NameValue(MetaNameValue {
                value: Expr::Lit(ExprLit {
                    lit: Lit::Str(lit), ..
                }),
                ..
            }) => Some(lit.value().trim().to_string()),
            _ => None,
        })
        .collect();

    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

/// Field docs keyed by the name serde writes, so they line up with schema properties.
pub fn serialized_field_docs(item: &ItemStruct) -> Vec<(String, String)> {
    let Fields::Named(fields) = &item.fields else {
        return Vec::new();
    };

    fields
        .named
        .iter()
        .filter_map(|field| {
            let doc = doc_text(&field.attrs)?;
            let key = serde_rename(field).or_else(|| field.ident.as_ref().map(|i| i.to_string()))?;
            Some((key, doc))
        })
        .collect()
}

fn serde_rename(field: &Field) -> Option<String> {
    let mut rename = None;
    for attr in field.attrs.iter().filter(|attr| attr.path().is_ident("serde")) {
        let _ = attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                let lit: LitStr = meta.value()?.parse()?;
                rename = Some(lit.value());
            } else if meta.input.peek(Token![=]) {
                let _: Expr = meta.value()?.parse()?;
            }
            Ok(())
        });
    }
    rename
}
