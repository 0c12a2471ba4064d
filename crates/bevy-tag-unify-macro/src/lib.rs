//! The `tags!` procedural macro for `bevy-tag-unify`.

use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::quote;
use syn::parse::{Parse, ParseStream};
use syn::{braced, token, Attribute, Ident, LitByteStr, LitStr, Result, Token, Visibility};

use proc_macro_crate::{crate_name, FoundCrate};

/// Maximum supported tree depth (0-7, encoded in 3 bits).
const MAX_DEPTH: usize = 8;

struct Node {
    /// Outer attributes (`///` docs, `#[deprecated]`, `#[cfg]`), forwarded to
    /// the generated module.
    attrs: Vec<Attribute>,
    name: Ident,
    children: Vec<Node>,
}

struct TagsInput {
    attrs: Vec<Attribute>,
    vis: Visibility,
    root: Ident,
    nodes: Vec<Node>,
}

impl Parse for TagsInput {
    fn parse(input: ParseStream) -> Result<Self> {
        let attrs = input.call(Attribute::parse_outer)?;
        let vis: Visibility = input.parse()?;
        input.parse::<Token![mod]>()?;
        let root: Ident = input.parse()?;
        let content;
        braced!(content in input);
        let nodes = parse_nodes(&content)?;
        Ok(Self {
            attrs,
            vis,
            root,
            nodes,
        })
    }
}

fn parse_nodes(input: ParseStream) -> Result<Vec<Node>> {
    let mut nodes = Vec::new();
    while !input.is_empty() {
        let attrs = input.call(Attribute::parse_outer)?;
        let name: Ident = input.parse()?;

        let children = if input.peek(token::Brace) {
            let content;
            braced!(content in input);
            parse_nodes(&content)?
        } else {
            input.parse::<Token![;]>()?;
            Vec::new()
        };

        nodes.push(Node {
            attrs,
            name,
            children,
        });
    }
    Ok(nodes)
}

// =============================================================================
// Tree analysis
// =============================================================================

/// A node with its full path, in declaration order (parents first).
struct FlatNode {
    segments: Vec<String>,
    span: Span,
}

impl FlatNode {
    fn path(&self) -> String {
        self.segments.join(".")
    }
}

fn flatten_nodes(nodes: &[Node], prefix: &[String], out: &mut Vec<FlatNode>) {
    for node in nodes {
        let mut segments = prefix.to_vec();
        segments.push(node.name.to_string());
        out.push(FlatNode {
            segments: segments.clone(),
            span: node.name.span(),
        });
        flatten_nodes(&node.children, &segments, out);
    }
}

fn validate(flat: &[FlatNode]) -> Result<()> {
    for node in flat {
        if node.segments.len() > MAX_DEPTH {
            return Err(syn::Error::new(
                node.span,
                format!(
                    "tag '{}' has depth {}, exceeding MAX_DEPTH ({})",
                    node.path(),
                    node.segments.len(),
                    MAX_DEPTH
                ),
            ));
        }
        if node.segments.last().is_some_and(|s| s.starts_with("r#")) {
            return Err(syn::Error::new(node.span, "raw identifiers cannot name tags"));
        }
    }
    for (i, a) in flat.iter().enumerate() {
        if let Some(b) = flat[..i].iter().find(|b| b.segments == a.segments) {
            let mut err = syn::Error::new(a.span, format!("duplicate tag '{}'", a.path()));
            err.combine(syn::Error::new(b.span, "first declared here"));
            return Err(err);
        }
    }
    Ok(())
}

// =============================================================================
// Crate path resolution
// =============================================================================

fn unify_crate_path() -> TokenStream2 {
    match crate_name("bevy-tag-unify") {
        Ok(FoundCrate::Itself) => quote!(::bevy_tag_unify),
        Ok(FoundCrate::Name(name)) => {
            let ident = Ident::new(&name, Span::call_site());
            quote!(::#ident)
        }
        Err(_) => quote!(::bevy_tag_unify),
    }
}

// =============================================================================
// Code generation
// =============================================================================

/// `Tag::from_segments(&[b"A", b"B"])` as a const block.
fn tag_expr(segments: &[String], krate: &TokenStream2) -> TokenStream2 {
    let count = segments.len();
    let lits: Vec<LitByteStr> = segments
        .iter()
        .map(|s| LitByteStr::new(s.as_bytes(), Span::call_site()))
        .collect();
    quote! {
        {
            const SEGS: [&[u8]; #count] = [#(#lits),*];
            #krate::Tag::from_segments(&SEGS)
        }
    }
}

/// One module per node, children nested inside.
///
/// ```ignore
/// tags! {
///     pub mod Tags {
///         Combat { Melee { Hit; } }
///     }
/// }
///
/// // Generates:
/// pub mod Tags {
///     pub mod Combat {
///         pub const TAG: Tag = ...;
///         pub const PATH: &str = "Combat";
///         pub const DEPTH: u8 = 0;
///         pub mod Melee { ... pub mod Hit { ... } }
///     }
/// }
/// ```
fn generate_modules(nodes: &[Node], prefix: &[String], krate: &TokenStream2) -> Vec<TokenStream2> {
    nodes
        .iter()
        .map(|node| {
            let mut segments = prefix.to_vec();
            segments.push(node.name.to_string());

            let attrs = &node.attrs;
            let ident = &node.name;
            let path = LitStr::new(&segments.join("."), Span::call_site());
            let depth = (segments.len() - 1) as u8;
            let tag = tag_expr(&segments, krate);
            let children = generate_modules(&node.children, &segments, krate);

            quote! {
                #(#attrs)*
                pub mod #ident {
                    /// Tag of this node, computed at compile time.
                    pub const TAG: #krate::Tag = #tag;
                    /// Full dotted path.
                    pub const PATH: &str = #path;
                    /// Depth in the tree (0 = top-level).
                    pub const DEPTH: u8 = #depth;

                    #(#children)*
                }
            }
        })
        .collect()
}

/// Compile-time GID collision checks between nodes of equal depth (the
/// depth bits already separate the others).
fn generate_collision_checks(flat: &[FlatNode], krate: &TokenStream2) -> TokenStream2 {
    let mut checks = Vec::new();
    for (i, a) in flat.iter().enumerate() {
        for b in &flat[i + 1..] {
            if a.segments.len() != b.segments.len() {
                continue;
            }
            let tag_a = tag_expr(&a.segments, krate);
            let tag_b = tag_expr(&b.segments, krate);
            let message = format!(
                "GID collision detected: '{}' and '{}' hash to the same value",
                a.path(),
                b.path()
            );
            checks.push(quote! {
                const _: () = assert!(#tag_a.gid() != #tag_b.gid(), #message);
            });
        }
    }
    quote! { #(#checks)* }
}

fn expand(input: TagsInput) -> Result<TokenStream2> {
    let mut flat = Vec::new();
    flatten_nodes(&input.nodes, &[], &mut flat);
    validate(&flat)?;

    let krate = unify_crate_path();
    let modules = generate_modules(&input.nodes, &[], &krate);
    let collision_checks = generate_collision_checks(&flat, &krate);

    // Parents before children, for registration order.
    flat.sort_by(|a, b| a.segments.len().cmp(&b.segments.len()));
    let paths: Vec<LitStr> = flat
        .iter()
        .map(|n| LitStr::new(&n.path(), Span::call_site()))
        .collect();
    let node_count = flat.len();
    let tree_depth = flat.iter().map(|n| n.segments.len()).max().unwrap_or(0);

    let TagsInput {
        attrs, vis, root, ..
    } = input;

    Ok(quote! {
        #(#attrs)*
        #[allow(non_snake_case, non_upper_case_globals, dead_code)]
        #vis mod #root {
            /// Number of tree levels.
            pub const TREE_DEPTH: usize = #tree_depth;

            /// Total number of nodes.
            pub const NODE_COUNT: usize = #node_count;

            /// Every node path, parents before children.
            pub const PATHS: &[&str] = &[#(#paths),*];

            #collision_checks

            #(#modules)*
        }
    })
}

// =============================================================================
// Entry point
// =============================================================================

/// Declare a tree of tags as nested modules of constants.
///
/// ```ignore
/// tags! {
///     pub mod Tags {
///         /// Anything fighting related.
///         Combat {
///             Melee { Hit; }
///             Ranged;
///         }
///         #[deprecated(note = "use Combat.Melee")]
///         Punch;
///     }
/// }
///
/// let hit: Tag = Tags::Combat::Melee::Hit::TAG;
/// assert_eq!(Tags::Combat::Melee::Hit::PATH, "Combat.Melee.Hit");
/// let names = TagNames::from_paths(Tags::PATHS)?;
/// ```
///
/// Same-named nodes under different parents do not conflict; duplicate
/// paths, trees deeper than 8 levels and GID collisions are compile errors.
#[proc_macro]
pub fn tags(input: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(input as TagsInput);
    expand(input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(tokens: TokenStream2) -> TagsInput {
        syn::parse2(tokens).unwrap()
    }

    #[test]
    fn same_name_under_different_roots() {
        let input = parse(quote! {
            pub mod Tags {
                Combat { Attack; }
                Movement { Attack; }
            }
        });
        let code = expand(input).unwrap().to_string();

        assert!(code.contains("pub mod Combat"));
        assert!(code.contains("pub mod Movement"));
        assert!(code.contains("\"Combat.Attack\""));
        assert!(code.contains("\"Movement.Attack\""));
        assert!(!code.contains("pub use"));
    }

    #[test]
    fn paths_list_parents_first() {
        let input = parse(quote! {
            mod Tags {
                A { X { Y; } }
                B;
            }
        });
        let mut flat = Vec::new();
        flatten_nodes(&input.nodes, &[], &mut flat);
        flat.sort_by(|a, b| a.segments.len().cmp(&b.segments.len()));
        let paths: Vec<String> = flat.iter().map(FlatNode::path).collect();

        assert_eq!(paths, ["A", "B", "A.X", "A.X.Y"]);
    }

    #[test]
    fn collision_checks_only_pair_equal_depths() {
        let input = parse(quote! {
            mod Tags {
                A { X; }
                B;
            }
        });
        let mut flat = Vec::new();
        flatten_nodes(&input.nodes, &[], &mut flat);
        let code = generate_collision_checks(&flat, &quote!(::bevy_tag_unify)).to_string();

        assert_eq!(code.matches("GID collision detected").count(), 1);
        assert!(code.contains("'A' and 'B'"));
    }

    #[test]
    fn rejects_duplicates_and_depth() {
        let duplicate = parse(quote! {
            mod Tags { A; A; }
        });
        assert!(expand(duplicate).is_err());

        let deep = parse(quote! {
            mod Tags { L0 { L1 { L2 { L3 { L4 { L5 { L6 { L7 { L8; } } } } } } } } }
        });
        let err = expand(deep).err().unwrap();
        assert!(err.to_string().contains("MAX_DEPTH"));
    }

    #[test]
    fn forwards_node_attributes() {
        let input = parse(quote! {
            pub mod Tags {
                #[deprecated(note = "gone")]
                Old;
            }
        });
        let code = expand(input).unwrap().to_string();
        assert!(code.contains("deprecated"));
    }
}
