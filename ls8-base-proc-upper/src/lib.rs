use proc_macro::{Literal, TokenStream, TokenTree};

/// Like stringify!() but upper-cased, so an opcode variant becomes its mnemonic.
///
/// LS-8 listings and the `TRACE`/disassembly output spell mnemonics in capitals
/// (`LDI`, `PRN`), while the `OPCode` variants stay CamelCase.
///
/// # Example
/// ```
/// # use ls8_base_proc_upper::upper;
/// assert_eq!(upper!(Ldi), "LDI");
/// ```
#[proc_macro]
pub fn upper(stream: TokenStream) -> TokenStream {
    let s = stream.to_string().to_uppercase();

    TokenTree::Literal(Literal::string(&s)).into()
}
