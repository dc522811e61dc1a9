use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};

use syn::spanned::Spanned as _;
use syn::{
    Attribute, Data, DeriveInput, Error, FnArg, GenericArgument, Ident, ImplItem, ItemImpl,
    ItemTrait, LitStr, Pat, PathArguments, ReturnType, TraitItem, TraitItemFn, Type,
};

const INJECT_ATTR: &str = "inject";
const FACTORY_ATTR: &str = "factory";
const MEMBER_ATTR: &str = "member";
const OUT_ATTR: &str = "out";

fn extract_generic<'a>(ty: &'a Type, wrapper: &str) -> Option<&'a Type> {
    if let Type::Path(type_path) = ty
        && let Some(segment) = type_path.path.segments.last()
        && segment.ident == wrapper
        && let PathArguments::AngleBracketed(args) = &segment.arguments
        && let Some(GenericArgument::Type(inner)) = args.args.first()
    {
        return Some(inner);
    }
    None
}

fn type_label(ty: &Type) -> String {
    quote!(#ty)
        .to_string()
        .replace("& ", "&")
        .replace(" <", "<")
        .replace("< ", "<")
        .replace(" >", ">")
        .replace(" ::", "::")
        .replace(":: ", "::")
        .replace(" ,", ",")
}

#[derive(Default)]
struct InjectOptions {
    name: Option<LitStr>,
    component: bool,
    default: bool,
}

fn parse_inject_options(attrs: &[Attribute]) -> syn::Result<InjectOptions> {
    let mut options = InjectOptions::default();
    for attr in attrs {
        if !attr.path().is_ident(INJECT_ATTR) {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                options.name = Some(meta.value()?.parse()?);
                Ok(())
            } else if meta.path.is_ident("component") {
                options.component = true;
                Ok(())
            } else if meta.path.is_ident("default") {
                options.default = true;
                Ok(())
            } else {
                Err(meta.error("expected `name = \"...\"`, `component` or `default`"))
            }
        })?;
    }
    Ok(options)
}

/// Expression producing a value of `ty` from the activation context `__ctx`.
fn injection_expr(ty: &Type, options: &InjectOptions) -> syn::Result<TokenStream2> {
    if options.default {
        return Ok(quote! { ::core::default::Default::default() });
    }
    if options.component {
        let (getter, component_ty) = match ty {
            Type::Reference(ref_ty) => (quote! { get_component_ref }, ref_ty.elem.as_ref()),
            _ => (quote! { get_component }, ty),
        };
        return Ok(quote! {
            __ctx.#getter::<#component_ty>().ok_or_else(|| {
                format!(
                    "Missing component: {}",
                    ::core::any::type_name::<#component_ty>()
                )
            })?
        });
    }
    if let Some(inner) = extract_generic(ty, "Arc") {
        return Ok(match &options.name {
            Some(name) => quote! { ::bindery::Resolver::get_named::<#inner>(__ctx, #name)? },
            None => quote! { ::bindery::Resolver::get::<#inner>(__ctx)? },
        });
    }
    if let Some(inner) = extract_generic(ty, "Option").and_then(|v| extract_generic(v, "Arc")) {
        if let Some(name) = &options.name {
            return Err(Error::new(
                name.span(),
                "Named dependencies cannot be optional",
            ));
        }
        return Ok(quote! { ::bindery::Resolver::try_get::<#inner>(__ctx)? });
    }
    if let Some(inner) = extract_generic(ty, "Vec").and_then(|v| extract_generic(v, "Arc")) {
        return Ok(quote! { ::bindery::Resolver::get_all::<#inner>(__ctx)? });
    }
    Err(Error::new(
        ty.span(),
        format!(
            "Dependencies must be Arc<T>, Option<Arc<T>> or Vec<Arc<T>>, \
             or use #[{INJECT_ATTR}(component)] or #[{INJECT_ATTR}(default)]"
        ),
    ))
}

/// Derives `bindery::Injectable` by resolving every field from the container.
///
/// - `Arc<T>` resolves the unnamed binding of `T`, or the named one with
///   `#[inject(name = "...")]`;
/// - `Option<Arc<T>>` is `None` when `T` is not bound;
/// - `Vec<Arc<T>>` collects every binding of `T`;
/// - `#[inject(component)]` clones an app component;
/// - `#[inject(default)]` uses `Default::default()`.
#[proc_macro_derive(Injectable, attributes(inject))]
pub fn derive_injectable(input: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(input as DeriveInput);
    handle_derive_injectable(input)
        .unwrap_or_else(Error::into_compile_error)
        .into()
}

/// Implements `bindery::Injectable` for the self type of an impl block by
/// calling its `#[factory]` constructor.
///
/// Constructor arguments follow the rules of `#[derive(Injectable)]`;
/// `#[inject(component)]` arguments may also be references. The constructor
/// returns `Self` or `Result<Self, E>` with `E: Into<bindery::StdError>`.
#[proc_macro_attribute]
pub fn injectable(_attr: TokenStream, item: TokenStream) -> TokenStream {
    if let Ok(item_impl) = syn::parse::<ItemImpl>(item) {
        return handle_injectable_impl(item_impl)
            .unwrap_or_else(Error::into_compile_error)
            .into();
    }
    TokenStream::from(
        Error::new(
            proc_macro2::Span::call_site(),
            "#[injectable] can only be applied to impl blocks",
        )
        .to_compile_error(),
    )
}

/// Generates an intercepting proxy for a trait.
///
/// For `trait Calculator` this emits `CalculatorProxy`, which forwards every
/// method through a `bindery::InterceptorChain` to the wrapped target, and
/// implements `bindery::Interceptable` for `dyn Calculator`.
///
/// The trait must be object safe with `Send + Sync` supertraits, and every
/// method must take `&self`. Arguments and return values must be `'static`:
///
/// - by-value arguments are passed as `In` slots;
/// - `&T` arguments are cloned into `In` slots (`&str` and `&[T]` become
///   `String` and `Vec<T>`);
/// - `&mut T` arguments are `Ref` slots (`T: Default`) written back after
///   the call; with `#[out]` they are `Out` slots that start empty.
///
/// `#[member(getter)]`, `#[member(setter)]`, `#[member(add)]` and
/// `#[member(remove)]` mark property and event accessors, optionally with
/// `name = "..."`; by default the name is the method name without its
/// `get_`/`set_`/`add_`/`remove_` prefix.
///
/// If the chain fails, methods returning `Result<_, E>` return
/// `Err(E::from(InvocationError))`; other methods panic.
#[proc_macro_attribute]
pub fn interceptable(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let item_trait = syn::parse_macro_input!(item as ItemTrait);
    handle_interceptable(item_trait)
        .unwrap_or_else(Error::into_compile_error)
        .into()
}

fn handle_derive_injectable(input: DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let fields = match &input.data {
        Data::Struct(s) => &s.fields,
        _ => return Err(Error::new(name.span(), "Only structs are supported")),
    };

    let mut field_lets = Vec::new();
    let mut field_inits = Vec::new();

    match fields {
        syn::Fields::Named(fields) => {
            for field in &fields.named {
                let Some(field_ident) = field.ident.as_ref() else {
                    continue;
                };
                let options = parse_inject_options(&field.attrs)?;
                let expr = injection_expr(&field.ty, &options)?;
                field_lets.push(quote! { let #field_ident = #expr; });
                field_inits.push(quote! { #field_ident });
            }
        }
        syn::Fields::Unnamed(_) => {
            return Err(Error::new(name.span(), "Tuple structs are not supported"));
        }
        syn::Fields::Unit => {}
    }

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    Ok(quote! {
        impl #impl_generics ::bindery::Injectable for #name #ty_generics #where_clause {
            fn inject(
                __ctx: &::bindery::Context<'_>
            ) -> ::core::result::Result<Self, ::bindery::StdError> {
                #(#field_lets)*
                Ok(Self {
                    #(#field_inits,)*
                })
            }
        }
    })
}

fn handle_injectable_impl(input: ItemImpl) -> syn::Result<TokenStream2> {
    if input.trait_.is_some() {
        return Err(Error::new(input.span(), "Trait impls are not supported"));
    }

    let mut factory = None;
    for item in &input.items {
        if let ImplItem::Fn(method) = item {
            for attr in &method.attrs {
                if attr.path().is_ident(FACTORY_ATTR) {
                    if factory.is_some() {
                        return Err(Error::new(attr.span(), "Only one factory method allowed"));
                    }
                    factory = Some(method);
                }
            }
        }
    }
    let Some(method) = factory else {
        return Err(Error::new(input.span(), "No factory method found"));
    };
    if let Some(asyncness) = method.sig.asyncness {
        return Err(Error::new(
            asyncness.span(),
            "Factory methods cannot be async; use a Service for asynchronous initialization",
        ));
    }

    let is_result = match &method.sig.output {
        ReturnType::Default => {
            return Err(Error::new(
                method.sig.span(),
                "Factory method must return Self or Result<Self, E>",
            ));
        }
        ReturnType::Type(_, ty) => extract_generic(ty, "Result").is_some(),
    };

    let mut arg_lets = Vec::new();
    let mut arg_names = Vec::new();
    for fn_arg in &method.sig.inputs {
        let pat_type = match fn_arg {
            FnArg::Receiver(_) => {
                return Err(Error::new(
                    fn_arg.span(),
                    "Factory method cannot have self parameter",
                ));
            }
            FnArg::Typed(pat_type) => pat_type,
        };
        let Pat::Ident(pat_ident) = pat_type.pat.as_ref() else {
            return Err(Error::new(
                pat_type.pat.span(),
                "Only simple bindings supported",
            ));
        };
        let arg_name = &pat_ident.ident;
        let options = parse_inject_options(&pat_type.attrs)?;
        let expr = injection_expr(&pat_type.ty, &options)?;
        arg_lets.push(quote! { let #arg_name = #expr; });
        arg_names.push(quote! { #arg_name });
    }

    // Strip helper attributes from the emitted impl.
    let mut cleaned_input = input.clone();
    for item in &mut cleaned_input.items {
        if let ImplItem::Fn(method) = item
            && method
                .attrs
                .iter()
                .any(|attr| attr.path().is_ident(FACTORY_ATTR))
        {
            method
                .attrs
                .retain(|attr| !attr.path().is_ident(FACTORY_ATTR));
            for input in &mut method.sig.inputs {
                if let FnArg::Typed(pat_type) = input {
                    pat_type
                        .attrs
                        .retain(|attr| !attr.path().is_ident(INJECT_ATTR));
                }
            }
            break;
        }
    }

    let method_name = &method.sig.ident;
    let call = quote! { Self::#method_name(#(#arg_names),*) };
    let body = if is_result {
        quote! { #call.map_err(::core::convert::Into::into) }
    } else {
        quote! { Ok(#call) }
    };
    let self_ty = &input.self_ty;
    let (impl_generics, _, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        #cleaned_input

        impl #impl_generics ::bindery::Injectable for #self_ty #where_clause {
            fn inject(
                __ctx: &::bindery::Context<'_>
            ) -> ::core::result::Result<Self, ::bindery::StdError> {
                #(#arg_lets)*
                #body
            }
        }
    })
}

enum ParamMode {
    /// Owned argument moved into its slot.
    Value(Type),
    /// `&T`, cloned into an owned slot.
    Shared(Type),
    /// `&str` or `&[T]`, converted with `ToOwned`.
    Borrowed(Type),
    /// `&mut T`, taken and written back.
    Ref(Type),
    /// `#[out] &mut T`, starts empty and written back if set.
    Out(Type),
}

impl ParamMode {
    fn direction(&self) -> TokenStream2 {
        match self {
            ParamMode::Value(_) | ParamMode::Shared(_) | ParamMode::Borrowed(_) => {
                quote! { ::bindery::Direction::In }
            }
            ParamMode::Ref(_) => quote! { ::bindery::Direction::Ref },
            ParamMode::Out(_) => quote! { ::bindery::Direction::Out },
        }
    }

    /// Type stored in the argument slot.
    fn slot_type(&self) -> TokenStream2 {
        match self {
            ParamMode::Value(ty) | ParamMode::Shared(ty) | ParamMode::Ref(ty) | ParamMode::Out(ty) => {
                quote! { #ty }
            }
            ParamMode::Borrowed(ty) => quote! { <#ty as ::std::borrow::ToOwned>::Owned },
        }
    }
}

struct MemberParam {
    name: Ident,
    label: String,
    mode: ParamMode,
}

struct MemberKind {
    kind: TokenStream2,
    accessor: Option<String>,
}

fn parse_member_kind(method: &TraitItemFn) -> syn::Result<MemberKind> {
    let mut member = MemberKind {
        kind: quote! { ::bindery::MemberKind::Method },
        accessor: None,
    };
    for attr in &method.attrs {
        if !attr.path().is_ident(MEMBER_ATTR) {
            continue;
        }
        let mut prefix = None;
        let mut name: Option<LitStr> = None;
        attr.parse_nested_meta(|meta| {
            let kind = if meta.path.is_ident("getter") {
                quote! { ::bindery::MemberKind::Getter }
            } else if meta.path.is_ident("setter") {
                quote! { ::bindery::MemberKind::Setter }
            } else if meta.path.is_ident("add") {
                quote! { ::bindery::MemberKind::EventAdd }
            } else if meta.path.is_ident("remove") {
                quote! { ::bindery::MemberKind::EventRemove }
            } else if meta.path.is_ident("name") {
                name = Some(meta.value()?.parse()?);
                return Ok(());
            } else {
                return Err(meta.error(
                    "expected `getter`, `setter`, `add`, `remove` or `name = \"...\"`",
                ));
            };
            prefix = meta.path.get_ident().map(|v| format!("{v}_"));
            member.kind = kind;
            Ok(())
        })?;
        let Some(prefix) = prefix else {
            return Err(Error::new(attr.span(), "Missing member kind"));
        };
        let method_name = method.sig.ident.to_string();
        let prefix = match prefix.as_str() {
            "getter_" => "get_",
            "setter_" => "set_",
            other => other,
        };
        member.accessor = Some(match name {
            Some(name) => name.value(),
            None => method_name
                .strip_prefix(prefix)
                .unwrap_or(&method_name)
                .to_owned(),
        });
    }
    Ok(member)
}

fn parse_member_params(method: &TraitItemFn) -> syn::Result<Vec<MemberParam>> {
    let mut params = Vec::new();
    for (index, input) in method.sig.inputs.iter().enumerate() {
        let pat_type = match input {
            FnArg::Receiver(receiver) => {
                if receiver.reference.is_none() || receiver.mutability.is_some() {
                    return Err(Error::new(
                        receiver.span(),
                        "Intercepted methods must take &self",
                    ));
                }
                continue;
            }
            FnArg::Typed(pat_type) => pat_type,
        };
        let name = match pat_type.pat.as_ref() {
            Pat::Ident(pat_ident) => format_ident!("__arg_{}", pat_ident.ident),
            _ => format_ident!("__arg{}", index),
        };
        let label = match pat_type.pat.as_ref() {
            Pat::Ident(pat_ident) => pat_ident.ident.to_string(),
            _ => format!("arg{index}"),
        };
        let is_out = pat_type.attrs.iter().any(|a| a.path().is_ident(OUT_ATTR));
        let mode = match pat_type.ty.as_ref() {
            Type::Reference(ref_ty) if ref_ty.mutability.is_some() => {
                let inner = ref_ty.elem.as_ref().clone();
                if is_out {
                    ParamMode::Out(inner)
                } else {
                    ParamMode::Ref(inner)
                }
            }
            _ if is_out => {
                return Err(Error::new(
                    pat_type.span(),
                    format!("#[{OUT_ATTR}] requires a &mut parameter"),
                ));
            }
            Type::Reference(ref_ty) => match ref_ty.elem.as_ref() {
                Type::Path(path) if path.path.is_ident("str") => {
                    ParamMode::Borrowed(ref_ty.elem.as_ref().clone())
                }
                Type::Slice(_) => ParamMode::Borrowed(ref_ty.elem.as_ref().clone()),
                inner => ParamMode::Shared(inner.clone()),
            },
            Type::ImplTrait(_) => {
                return Err(Error::new(
                    pat_type.ty.span(),
                    "impl Trait arguments cannot be intercepted",
                ));
            }
            ty => ParamMode::Value(ty.clone()),
        };
        params.push(MemberParam { name, label, mode });
    }
    Ok(params)
}

fn strip_member_attrs(method: &mut TraitItemFn) {
    method.attrs.retain(|a| !a.path().is_ident(MEMBER_ATTR));
    for input in &mut method.sig.inputs {
        if let FnArg::Typed(pat_type) = input {
            pat_type.attrs.retain(|a| !a.path().is_ident(OUT_ATTR));
        }
    }
}

fn handle_interceptable(mut input: ItemTrait) -> syn::Result<TokenStream2> {
    if !input.generics.params.is_empty() {
        return Err(Error::new(
            input.generics.span(),
            "Generic traits cannot be intercepted",
        ));
    }
    let trait_ident = input.ident.clone();
    let trait_name = trait_ident.to_string();
    let upper = trait_name.to_uppercase();
    let vis = &input.vis;
    let proxy_ident = format_ident!("{}Proxy", trait_ident);
    let members_ident = format_ident!("__BINDERY_{}_MEMBERS", upper);

    let mut param_statics = Vec::new();
    let mut member_inits = Vec::new();
    let mut proxy_methods = Vec::new();

    let mut methods = Vec::new();
    for item in &input.items {
        match item {
            TraitItem::Fn(method) => methods.push(method.clone()),
            other => {
                return Err(Error::new(
                    other.span(),
                    "Only methods can be intercepted",
                ));
            }
        }
    }

    for (index, method) in methods.iter().enumerate() {
        let sig = &method.sig;
        if let Some(asyncness) = sig.asyncness {
            return Err(Error::new(
                asyncness.span(),
                "Async methods cannot be intercepted",
            ));
        }
        if !sig.generics.params.is_empty() || sig.generics.where_clause.is_some() {
            return Err(Error::new(
                sig.generics.span(),
                "Generic methods cannot be intercepted",
            ));
        }
        if !matches!(sig.inputs.first(), Some(FnArg::Receiver(_))) {
            return Err(Error::new(sig.span(), "Intercepted methods must take &self"));
        }

        let method_ident = &sig.ident;
        let method_name = method_ident.to_string();
        let member = parse_member_kind(method)?;
        let params = parse_member_params(method)?;

        let return_ty = match &sig.output {
            ReturnType::Default => None,
            ReturnType::Type(_, ty) => match ty.as_ref() {
                Type::Tuple(tuple) if tuple.elems.is_empty() => None,
                Type::Reference(_) => {
                    return Err(Error::new(
                        ty.span(),
                        "Intercepted methods cannot return references",
                    ));
                }
                Type::ImplTrait(_) => {
                    return Err(Error::new(
                        ty.span(),
                        "Intercepted methods cannot return impl Trait",
                    ));
                }
                ty => Some(ty.clone()),
            },
        };

        // Static member description.
        let params_ident = format_ident!(
            "__BINDERY_{}_{}_PARAMS",
            upper,
            method_name.to_uppercase()
        );
        let param_count = params.len();
        let param_inits = params.iter().map(|p| {
            let label = &p.label;
            let direction = p.mode.direction();
            let type_label = match &p.mode {
                ParamMode::Value(ty) => type_label(ty),
                ParamMode::Shared(ty) | ParamMode::Borrowed(ty) => format!("&{}", type_label(ty)),
                ParamMode::Ref(ty) | ParamMode::Out(ty) => format!("&mut {}", type_label(ty)),
            };
            quote! { ::bindery::Parameter::new(#label, #type_label, #direction) }
        });
        param_statics.push(quote! {
            #[doc(hidden)]
            static #params_ident: [::bindery::Parameter; #param_count] = [#(#param_inits),*];
        });
        let return_label = match &return_ty {
            Some(ty) => {
                let label = type_label(ty);
                quote! { ::core::option::Option::Some(#label) }
            }
            None => quote! { ::core::option::Option::None },
        };
        let kind = &member.kind;
        let accessor = member.accessor.as_ref().map(|name| quote! { .accessor_of(#name) });
        member_inits.push(quote! {
            ::bindery::Member::new(#trait_name, #method_name, #kind, &#params_ident, #return_label)
                #accessor
        });

        // Proxy method.
        let mut pushes = Vec::new();
        let mut takes = Vec::new();
        let mut call_args = Vec::new();
        let mut puts_back = Vec::new();
        let mut write_backs = Vec::new();
        let mut signature_args = Vec::new();
        for (slot, param) in params.iter().enumerate() {
            let name = &param.name;
            let slot_ty = param.mode.slot_type();
            match &param.mode {
                ParamMode::Value(ty) => {
                    signature_args.push(quote! { #name: #ty });
                    pushes.push(quote! { __arguments.push(#name); });
                    takes.push(quote! { let #name = __arguments.take::<#slot_ty>(#slot)?; });
                    call_args.push(quote! { #name });
                }
                ParamMode::Shared(ty) => {
                    signature_args.push(quote! { #name: &#ty });
                    pushes.push(quote! {
                        __arguments.push(<#ty as ::core::clone::Clone>::clone(#name));
                    });
                    takes.push(quote! { let #name = __arguments.take::<#slot_ty>(#slot)?; });
                    call_args.push(quote! { &#name });
                }
                ParamMode::Borrowed(ty) => {
                    signature_args.push(quote! { #name: &#ty });
                    pushes.push(quote! {
                        __arguments.push(<#ty as ::std::borrow::ToOwned>::to_owned(#name));
                    });
                    takes.push(quote! { let #name = __arguments.take::<#slot_ty>(#slot)?; });
                    call_args.push(quote! { &#name });
                }
                ParamMode::Ref(ty) | ParamMode::Out(ty) => {
                    signature_args.push(quote! { #name: &mut #ty });
                    if matches!(param.mode, ParamMode::Ref(_)) {
                        pushes.push(quote! {
                            __arguments.push(::core::mem::take(#name));
                        });
                    } else {
                        pushes.push(quote! { __arguments.push_empty(); });
                    }
                    takes.push(quote! {
                        let mut #name: #ty = if __arguments.is_set(#slot) {
                            __arguments.take::<#slot_ty>(#slot)?
                        } else {
                            ::core::default::Default::default()
                        };
                    });
                    call_args.push(quote! { &mut #name });
                    puts_back.push(quote! { __arguments.set(#slot, #name)?; });
                    write_backs.push(quote! {
                        if let ::core::result::Result::Ok(__value) =
                            __outcome.arguments_mut().take::<#slot_ty>(#slot)
                        {
                            *#name = __value;
                        }
                    });
                }
            }
        }

        let member_ref = quote! { &#members_ident[#index] };
        let output = &sig.output;
        // Ref and Out slots are written back even when the chain fails.
        let finish = match &return_ty {
            None => quote! {
                #(#write_backs)*
                if let ::core::option::Option::Some(__err) = __outcome.take_failure() {
                    panic!("{}: {}", #members_ident[#index], __err)
                }
            },
            Some(ty) => quote! {
                #(#write_backs)*
                let __value = match __outcome.take_failure() {
                    ::core::option::Option::Some(__err) => ::core::result::Result::Err(__err),
                    ::core::option::Option::None => __outcome.take_return_value::<#ty>(),
                };
                match __value {
                    ::core::result::Result::Ok(__value) => __value,
                    ::core::result::Result::Err(__err) => {
                        use ::bindery::{PanicFailure as _, ReturnFailure as _};
                        (&::bindery::ProxyFailure::<#ty>::new()).fail(&#members_ident[#index], __err)
                    }
                }
            },
        };

        proxy_methods.push(quote! {
            #[allow(unused_mut)]
            fn #method_ident(&self, #(#signature_args),*) #output {
                let mut __arguments = ::bindery::Arguments::with_capacity(#param_count);
                #(#pushes)*
                let __target = &self.target;
                let mut __outcome = self.chain.execute(
                    #member_ref,
                    __arguments,
                    &|__arguments: &mut ::bindery::Arguments|
                        -> ::core::result::Result<
                            ::std::boxed::Box<dyn ::core::any::Any>,
                            ::bindery::InvocationError,
                        >
                    {
                        #(#takes)*
                        let __value = __target.#method_ident(#(#call_args),*);
                        #(#puts_back)*
                        ::core::result::Result::Ok(::std::boxed::Box::new(__value))
                    },
                );
                #finish
            }
        });
    }

    for item in &mut input.items {
        if let TraitItem::Fn(method) = item {
            strip_member_attrs(method);
        }
    }

    let member_count = member_inits.len();
    let proxy_doc = format!("Intercepting proxy for [`{trait_name}`].");

    Ok(quote! {
        #input

        #(#param_statics)*

        #[doc(hidden)]
        static #members_ident: [::bindery::Member; #member_count] = [#(#member_inits),*];

        #[doc = #proxy_doc]
        #vis struct #proxy_ident {
            target: ::std::sync::Arc<dyn #trait_ident>,
            chain: ::std::sync::Arc<::bindery::InterceptorChain>,
        }

        impl #proxy_ident {
            /// The wrapped service.
            pub fn target(&self) -> &::std::sync::Arc<dyn #trait_ident> {
                &self.target
            }
        }

        impl #trait_ident for #proxy_ident {
            #(#proxy_methods)*
        }

        impl ::bindery::Interceptable for dyn #trait_ident {
            fn members() -> &'static [::bindery::Member] {
                &#members_ident
            }

            fn proxy(
                target: ::std::sync::Arc<Self>,
                chain: ::std::sync::Arc<::bindery::InterceptorChain>,
            ) -> ::std::sync::Arc<Self> {
                ::std::sync::Arc::new(#proxy_ident { target, chain })
            }
        }
    })
}
