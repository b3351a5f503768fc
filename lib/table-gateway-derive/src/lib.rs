use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{Data, DeriveInput, Fields, Ident, Lit, parse_macro_input, punctuated::Punctuated};

/// Options from `#[column(...)]` on one field.
#[derive(Default)]
struct ColumnAttrs {
    skip: bool,
    key: bool,
    trim: bool,
    name: Option<String>,
}

/// A field that maps to a column.
struct MappedField<'a> {
    ident: &'a Ident,
    column: String,
    attrs: ColumnAttrs,
}

fn parse_str_value(meta: &syn::meta::ParseNestedMeta) -> syn::Result<String> {
    meta.input.parse::<syn::Token![=]>()?;
    let lit: Lit = meta.input.parse()?;
    match lit {
        Lit::Str(s) => Ok(s.value()),
        other => Err(syn::Error::new_spanned(other, "expected a string literal")),
    }
}

fn parse_column_attrs(field: &syn::Field) -> syn::Result<ColumnAttrs> {
    let mut attrs = ColumnAttrs::default();
    for attr in &field.attrs {
        if !attr.path().is_ident("column") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("skip") {
                attrs.skip = true;
            } else if meta.path.is_ident("key") {
                attrs.key = true;
            } else if meta.path.is_ident("trim") {
                attrs.trim = true;
            } else if meta.path.is_ident("name") {
                attrs.name = Some(parse_str_value(&meta)?);
            } else {
                return Err(meta.error("expected `skip`, `key`, `trim` or `name = \"...\"`"));
            }
            Ok(())
        })?;
    }
    Ok(attrs)
}

/// Parse `#[entity(table = "...")]` and return the table name.
fn parse_table_attr(input: &DeriveInput) -> syn::Result<String> {
    for attr in &input.attrs {
        if attr.path().is_ident("entity") {
            let mut table_name = None;
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("table") {
                    table_name = Some(parse_str_value(&meta)?);
                    Ok(())
                } else {
                    Err(meta.error("expected `table = \"...\"`"))
                }
            })?;
            if let Some(table_name) = table_name {
                return Ok(table_name);
            }
        }
    }
    Err(syn::Error::new_spanned(
        &input.ident,
        "Entity requires #[entity(table = \"...\")]",
    ))
}

fn named_fields<'a>(
    input: &'a DeriveInput,
    derive: &str,
) -> syn::Result<&'a Punctuated<syn::Field, syn::Token![,]>> {
    match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => Ok(&fields.named),
            _ => Err(syn::Error::new_spanned(
                &input.ident,
                format!("{derive} only supports structs with named fields"),
            )),
        },
        _ => Err(syn::Error::new_spanned(
            &input.ident,
            format!("{derive} only supports structs"),
        )),
    }
}

/// Split fields into mapped columns and skipped fields.
fn mapped_fields<'a>(
    fields: &'a Punctuated<syn::Field, syn::Token![,]>,
) -> syn::Result<(Vec<MappedField<'a>>, Vec<&'a Ident>)> {
    let mut mapped = Vec::new();
    let mut skipped = Vec::new();
    for field in fields {
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        let attrs = parse_column_attrs(field)?;
        if attrs.skip {
            skipped.push(ident);
            continue;
        }
        let column = attrs.name.clone().unwrap_or_else(|| ident.to_string());
        mapped.push(MappedField {
            ident,
            column,
            attrs,
        });
    }
    Ok((mapped, skipped))
}

/// Derive macro for the `Entity` and `Hydrate` traits.
///
/// ## Attributes
///
/// - `#[entity(table = "...")]` on the struct (required)
/// - `#[column(key)]` marks a primary key column; several make a composite key
/// - `#[column(name = "...")]` overrides the column name
/// - `#[column(trim)]` trims the value in `apply_filters` (`String` / `Option<String>`)
/// - `#[column(skip)]` keeps the field out of the schema
///
/// The struct must implement `Default` and `Clone`; every mapped field type
/// must convert into `Value` and implement `FromValue`.
///
/// ## Example
///
/// ```text
/// #[derive(Debug, Clone, Default, Entity)]
/// #[entity(table = "user_group_member")]
/// pub struct UserGroupMember {
///     #[column(key)]
///     pub group_id: String,
///     #[column(key)]
///     pub user_id: String,
///     pub created_dt: Option<DateTime<Utc>>,
/// }
/// ```
#[proc_macro_derive(Entity, attributes(entity, column))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand_entity(&input) {
        Ok(tokens) => tokens.into(),
        Err(error) => error.to_compile_error().into(),
    }
}

fn expand_entity(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let name_str = name.to_string();
    let table_name = parse_table_attr(input)?;
    let (fields, _) = mapped_fields(named_fields(input, "Entity")?)?;

    let key_columns: Vec<&str> = fields
        .iter()
        .filter(|f| f.attrs.key)
        .map(|f| f.column.as_str())
        .collect();
    if key_columns.is_empty() {
        return Err(syn::Error::new_spanned(
            name,
            "Entity requires at least one #[column(key)] field",
        ));
    }

    let column_literals: Vec<&str> = fields.iter().map(|f| f.column.as_str()).collect();
    let column_count = column_literals.len();
    let idents: Vec<&Ident> = fields.iter().map(|f| f.ident).collect();
    let trimmed: Vec<&Ident> = fields
        .iter()
        .filter(|f| f.attrs.trim)
        .map(|f| f.ident)
        .collect();

    Ok(quote! {
        impl table_gateway::Entity for #name {
            const TABLE: &'static str = #table_name;
            const PRIMARY_KEY: &'static [&'static str] = &[#(#key_columns),*];

            fn columns() -> &'static [&'static str] {
                &[#(#column_literals),*]
            }

            fn get(&self, column: &str) -> Option<table_gateway::Value> {
                match column {
                    #(#column_literals => Some(table_gateway::Value::from(self.#idents.clone())),)*
                    _ => None,
                }
            }

            fn set(
                &mut self,
                column: &str,
                value: table_gateway::Value,
            ) -> Result<(), table_gateway::GatewayError> {
                match column {
                    #(#column_literals => {
                        self.#idents = table_gateway::FromValue::from_value(column, value)?;
                        Ok(())
                    })*
                    _ => Err(table_gateway::GatewayError::UnknownField {
                        entity: #name_str,
                        field: column.to_string(),
                    }),
                }
            }

            fn object_copy(&self) -> table_gateway::Row {
                let mut row = table_gateway::Row::with_capacity(#column_count);
                #(row.insert(#column_literals, self.#idents.clone());)*
                row
            }

            fn apply_filters(&mut self) {
                #(table_gateway::TrimFilter::trim_in_place(&mut self.#trimmed);)*
            }
        }

        impl table_gateway::Hydrate for #name {
            const TARGET: &'static str = #name_str;

            fn hydrate(row: &table_gateway::Row) -> Result<Self, table_gateway::GatewayError> {
                <Self as table_gateway::Entity>::from_row(row)
            }
        }
    })
}

/// Derive macro for the `Dto` and `Hydrate` traits.
///
/// Every result column must map to a field; a column without one fails
/// hydration with `GatewayError::UnmappedColumn`. A field whose column is
/// absent hydrates from `NULL`, so `Option` fields read as `None`.
///
/// `#[column(name = "...")]` and `#[column(skip)]` work as for `Entity`;
/// skipped fields take `Default::default()`.
///
/// ## Example
///
/// ```text
/// #[derive(Debug, Clone, Dto)]
/// pub struct TagDto {
///     pub tag_id: String,
///     pub name: String,
///     pub asset_count: i64,
/// }
/// ```
#[proc_macro_derive(Dto, attributes(column))]
pub fn derive_dto(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand_dto(&input) {
        Ok(tokens) => tokens.into(),
        Err(error) => error.to_compile_error().into(),
    }
}

fn expand_dto(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let name_str = name.to_string();
    let (fields, skipped) = mapped_fields(named_fields(input, "Dto")?)?;

    let column_literals: Vec<&str> = fields.iter().map(|f| f.column.as_str()).collect();
    let idents: Vec<&Ident> = fields.iter().map(|f| f.ident).collect();

    Ok(quote! {
        impl table_gateway::Dto for #name {
            fn fields() -> &'static [&'static str] {
                &[#(#column_literals),*]
            }
        }

        impl table_gateway::Hydrate for #name {
            const TARGET: &'static str = #name_str;

            fn hydrate(row: &table_gateway::Row) -> Result<Self, table_gateway::GatewayError> {
                let fields = <Self as table_gateway::Dto>::fields();
                if let Some(column) = row.columns().find(|column| !fields.contains(column)) {
                    return Err(table_gateway::GatewayError::UnmappedColumn {
                        target: #name_str,
                        column: column.to_string(),
                    });
                }
                Ok(Self {
                    #(#idents: table_gateway::FromValue::from_value(
                        #column_literals,
                        row.get(#column_literals)
                            .cloned()
                            .unwrap_or(table_gateway::Value::Null),
                    )?,)*
                    #(#skipped: Default::default(),)*
                })
            }
        }
    })
}
