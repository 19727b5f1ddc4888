//! End-to-end lowering tests: source text through the real scanner and
//! parser, then assertions over the printed IR.

use sol_ir::StringInterner;
use sol_ssa::Target;

use crate::{abi, emit_source_unit};

fn compile(source: &str) -> String {
    compile_for(source, Target::Evm)
}

fn compile_for(source: &str, target: Target) -> String {
    let interner = StringInterner::new();
    let tokens = sol_lexer::lex(source, &interner);
    let output = sol_parse::parse(tokens, &interner);
    assert!(
        !output.has_errors(),
        "parse errors: {:?}",
        output.errors
    );
    let module = emit_source_unit(
        &output.unit,
        &output.ast,
        &output.types,
        &interner,
        "test",
        target,
    )
    .unwrap_or_else(|e| panic!("lowering failed: {e}"));
    module.to_string()
}

const STORAGE_CONTRACT: &str = "pragma solidity ^0.5.0;\n\
     contract C { uint256 x; \
     function set(uint256 v) public { x = v; } \
     function get() public view returns (uint256) { return x; } }";

#[test]
fn storage_write_lowers_through_bswap() {
    let ir = compile(STORAGE_CONTRACT);
    // set: storageStore(0, bswap256(v))
    assert!(ir.contains("define void @C.set(i256 %v)"), "{ir}");
    assert!(ir.contains("call i256 @bswap256(i256 %"), "{ir}");
    assert!(ir.contains("call void @storageStore(i256 0, i256 %"), "{ir}");
}

#[test]
fn storage_read_lowers_through_bswap() {
    let ir = compile(STORAGE_CONTRACT);
    // get: bswap256(storageLoad(0))
    assert!(ir.contains("define i256 @C.get()"), "{ir}");
    assert!(ir.contains("call i256 @storageLoad(i256 0)"), "{ir}");
}

#[test]
fn dispatcher_matches_known_selectors() {
    let ir = compile(STORAGE_CONTRACT);
    assert!(ir.contains("define void @solidity.main()"), "{ir}");
    // Selector constants compare against the byte-swapped call-data word.
    let set_sel = abi::selector("set(uint256)");
    let get_sel = abi::selector("get()");
    assert_eq!(set_sel, 0x60fe_47b1);
    assert_eq!(get_sel, 0x6d4c_e63c);
    assert!(ir.contains("icmp eq i32 %"), "{ir}");
    assert!(ir.contains(&set_sel.to_string()), "{ir}");
    assert!(ir.contains(&get_sel.to_string()), "{ir}");
    // Size guard and revert-by-default.
    assert!(ir.contains("call i32 @getCallDataSize()"), "{ir}");
    assert!(ir.contains("icmp ult i32 %"), "{ir}");
    assert!(ir.contains("call void @revert(ptr %"), "{ir}");
}

#[test]
fn dispatcher_decodes_arguments_and_encodes_results() {
    let ir = compile(STORAGE_CONTRACT);
    // Argument decode: callDataCopy + endian conversion, then the call.
    assert!(ir.contains("call void @callDataCopy(ptr %"), "{ir}");
    assert!(ir.contains("call void @C.set(i256 %"), "{ir}");
    // Result encode: bswap before finish(buf, 32).
    assert!(ir.contains("call i256 @C.get()"), "{ir}");
    assert!(ir.contains("call void @finish(ptr %"), "{ir}");
}

#[test]
fn ewasm_entry_point_is_main() {
    let ir = compile_for(STORAGE_CONTRACT, Target::Ewasm);
    assert!(ir.contains("define void @main()"), "{ir}");
    assert!(ir.contains("; target = ewasm"), "{ir}");
}

#[test]
fn constructor_initializes_state_variables() {
    let ir = compile("contract C { uint256 x = 5; uint256 y; }");
    assert!(ir.contains("define void @C.solidity.constructor()"), "{ir}");
    // x = 5 stored big-endian into slot 0; y zero-initialized in slot 1.
    assert!(ir.contains("call i256 @bswap256(i256 5)"), "{ir}");
    assert!(ir.contains("call void @storageStore(i256 0, i256 %"), "{ir}");
    assert!(ir.contains("call void @storageStore(i256 1, i256 0)"), "{ir}");
}

#[test]
fn user_constructor_body_runs_after_state_init() {
    let ir = compile(
        "contract C { uint256 x; constructor(uint256 start) public { x = start; } }",
    );
    assert!(
        ir.contains("define void @C.solidity.constructor(i256 %start)"),
        "{ir}"
    );
    assert!(ir.contains("call void @storageStore(i256 0, i256 0)"), "{ir}");
    assert!(ir.contains("call void @storageStore(i256 0, i256 %"), "{ir}");
}

#[test]
fn event_emission_lowers_to_log_with_topics() {
    let ir = compile(
        r#"contract C { event E(uint256 indexed k, bytes v);
           function f() public { emit E(1, hex"aa"); } }"#,
    );
    // Two topics: the signature hash and the indexed argument.
    assert!(ir.contains("call void @log2(ptr %"), "{ir}");
    let hash = abi::signature_hash("E(uint256,bytes)");
    let mut hex = String::from("u0x");
    for b in hash {
        hex.push_str(&format!("{b:02x}"));
    }
    assert!(ir.contains(&hex), "{ir}");
}

#[test]
fn uint_canonicalizes_to_uint256_in_selectors() {
    let interner = StringInterner::new();
    let tokens = sol_lexer::lex(
        "contract C { function f(uint a) public {} }",
        &interner,
    );
    let output = sol_parse::parse(tokens, &interner);
    assert!(!output.has_errors(), "{:?}", output.errors);
    let contract = match output.unit.items[0] {
        sol_ir::SourceItem::Contract(id) => id,
        _ => panic!("expected contract"),
    };
    let func = output.ast.contract(contract).functions[0];
    let signature = abi::canonical_signature(&output.ast, &output.types, &interner, func);
    assert_eq!(signature, "f(uint256)");
    assert_eq!(abi::selector(&signature), abi::selector("f(uint256)"));
}

#[test]
fn while_loop_produces_header_body_exit() {
    let ir = compile(
        "contract C { function f(uint256 n) public returns (uint256) {
             uint256 acc = 0;
             while (n > 0) { acc = acc + n; n = n - 1; }
             return acc;
         } }",
    );
    assert!(ir.contains("while.cond:"), "{ir}");
    assert!(ir.contains("while.body:"), "{ir}");
    assert!(ir.contains("while.end:"), "{ir}");
    assert!(ir.contains("br label %while.cond"), "{ir}");
    assert!(ir.contains("icmp ugt i256 %"), "{ir}");
}

#[test]
fn for_loop_continue_targets_the_step_block() {
    let ir = compile(
        "contract C { function f() public returns (uint256) {
             uint256 acc = 0;
             for (uint256 i = 0; i < 10; i++) {
                 if (i == 3) { continue; }
                 acc = acc + i;
             }
             return acc;
         } }",
    );
    assert!(ir.contains("for.cond:"), "{ir}");
    assert!(ir.contains("for.inc:"), "{ir}");
    assert!(ir.contains("br label %for.inc"), "{ir}");
}

#[test]
fn do_while_tests_at_the_tail() {
    let ir = compile(
        "contract C { function f(uint256 n) public { do { n = n - 1; } while (n > 0); } }",
    );
    // Entry branches straight into the body, not the condition.
    let entry_pos = ir.find("entry:").unwrap();
    let after_entry = &ir[entry_pos..];
    let first_br = after_entry
        .lines()
        .find(|l| l.trim_start().starts_with("br "))
        .unwrap();
    assert!(first_br.contains("while.body"), "{ir}");
}

#[test]
fn internal_calls_use_mangled_names() {
    let ir = compile(
        "contract C { function a() public returns (uint256) { return b(); }
                      function b() public returns (uint256) { return 1; } }",
    );
    assert!(ir.contains("call i256 @C.b()"), "{ir}");
}

#[test]
fn conditional_expression_merges_through_memory() {
    let ir = compile(
        "contract C { function max(uint256 a, uint256 b) public returns (uint256) {
             return a > b ? a : b;
         } }",
    );
    assert!(ir.contains("cond.then:"), "{ir}");
    assert!(ir.contains("cond.else:"), "{ir}");
    assert!(ir.contains("cond.end:"), "{ir}");
}

#[test]
fn mapping_index_hashes_key_and_slot() {
    let ir = compile(
        "contract C { mapping(address => uint256) balances;
           function put(address k, uint256 v) public { balances[k] = v; } }",
    );
    assert!(ir.contains("call i256 @keccak256(ptr %"), "{ir}");
    assert!(ir.contains("call void @storageStore(i256 %"), "{ir}");
}

#[test]
fn fallback_receives_short_calldata() {
    let ir = compile("contract C { function () external { } }");
    assert!(ir.contains("define void @C.solidity.fallback()"), "{ir}");
    assert!(ir.contains("call void @C.solidity.fallback()"), "{ir}");
}

#[test]
fn exponentiation_lowers_to_a_loop() {
    let ir = compile(
        "contract C { function p(uint256 b, uint256 e) public returns (uint256) { return b ** e; } }",
    );
    assert!(ir.contains("pow.cond:"), "{ir}");
    assert!(ir.contains("pow.body:"), "{ir}");
    assert!(ir.contains("mul i256 %"), "{ir}");
}

#[test]
fn logical_and_short_circuits_the_right_operand() {
    let ir = compile(
        "contract C { function f(uint256 x, uint256 y) public returns (bool) {
             return x != 0 && y / x > 0;
         } }",
    );
    assert!(ir.contains("land.rhs:"), "{ir}");
    assert!(ir.contains("land.end:"), "{ir}");
    // A false left operand skips the division entirely.
    assert!(ir.contains("label %land.rhs, label %land.end"), "{ir}");
    let rhs_pos = ir.find("land.rhs:").unwrap();
    let div_pos = ir.find("udiv i256").unwrap();
    assert!(div_pos > rhs_pos, "division must sit in the guarded block:\n{ir}");
}

#[test]
fn logical_or_short_circuits_the_right_operand() {
    let ir = compile(
        "contract C { function g(uint256 x, uint256 y) public returns (bool) {
             return x == 0 || y / x > 0;
         } }",
    );
    assert!(ir.contains("lor.rhs:"), "{ir}");
    assert!(ir.contains("lor.end:"), "{ir}");
    // A true left operand skips the right operand entirely.
    assert!(ir.contains("label %lor.end, label %lor.rhs"), "{ir}");
    let rhs_pos = ir.find("lor.rhs:").unwrap();
    let div_pos = ir.find("udiv i256").unwrap();
    assert!(div_pos > rhs_pos, "division must sit in the guarded block:\n{ir}");
}

#[test]
fn fixed_array_initializer_copies_the_source() {
    let ir = compile(
        "contract C { function f() public {
             uint256[2] memory a;
             a[0] = 1;
             uint256[2] memory b = a;
             b[1] = 2;
         } }",
    );
    // Both arrays get their own allocation; the initializer copies one
    // word per element.
    assert!(ir.contains("alloca i256, i32 2"), "{ir}");
    assert!(ir.contains("call ptr @memcpy(ptr %"), "{ir}");
    assert!(ir.contains("i32 64)"), "{ir}");
}

#[test]
fn compound_assignment_reads_then_writes_storage() {
    let ir = compile(
        "contract C { uint256 total; function add(uint256 v) public { total += v; } }",
    );
    assert!(ir.contains("call i256 @storageLoad(i256 0)"), "{ir}");
    assert!(ir.contains("call void @storageStore(i256 0, i256 %"), "{ir}");
    assert!(ir.contains("add i256 %"), "{ir}");
}
