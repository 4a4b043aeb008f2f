//! # Script Interpreter (reference adapter)
//!
//! A small line-oriented contract language implementing the `Interpreter`
//! port, used for local simulation and tests.
//!
//! ```text
//! contract Transfer {
//!     data {
//!         Amount int
//!         Comment string optional
//!     }
//!     conditions {
//!         require $amount > 0
//!     }
//!     action {
//!         insert history amount=$amount comment=$comment
//!         call Audit amount=$amount
//!         result done
//!     }
//! }
//!
//! func helper {
//!     charge 1
//! }
//! ```
//!
//! Every executed statement costs 1 fuel on top of explicit `charge N`.
//!
//! | Statement | Effect |
//! |-----------|--------|
//! | `charge N` | deduct `N` fuel |
//! | `set NAME VALUE` | set an environment field |
//! | `call NAME k=v ...` | nested contract call, result in `$ret` |
//! | `insert TABLE k=v ...` | row insert, id in `$last_id` |
//! | `update TABLE ID k=v ...` | row update |
//! | `select TABLE ID c1,c2` | row read into `$row` |
//! | `require EXPR` | fail unless `EXPR` holds |
//! | `condition PARAM [conditions]` | ecosystem parameter check |
//! | `activate TABLE_ID ECO true\|false` | toggle contract activation |
//! | `wallet TABLE_ID ECO WALLET` | reassign contract wallet |
//! | `notify KEY TEXT` | queue a notification |
//! | `result VALUE` / `result_hex HEX` | set the result slot |
//! | `fail TEXT` | raise an error |
//! | `spin MS` | busy-wait (time-limit testing) |

use crate::domain::entities::{CompiledUnit, ContractField, OwnerInfo, ProgramHandle, UnitKind};
use crate::domain::environment::{EnvKey, Environment};
use crate::domain::services::state_name;
use crate::domain::value_objects::Value;
use crate::errors::{CompileError, EvalError, RuntimeError};
use crate::ports::outbound::{ContractHost, Interpreter, Row};
use std::collections::{BTreeMap, BTreeSet};
use std::time::{Duration, Instant};

/// Built-in system functions compiled before any contract.
pub const SYSTEM_FUNCTIONS: &str = r"
func sys_charge_base {
    charge 1
}

func sys_noop {
}
";

// =============================================================================
// PROGRAM REPRESENTATION
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Operand {
    Var(String),
    Int(i64),
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
enum Statement {
    Charge(i64),
    Set(String, Operand),
    Call(String, Vec<(String, Operand)>),
    Insert(String, Vec<(String, Operand)>),
    Update(String, Operand, Vec<(String, Operand)>),
    Select(String, Operand, Vec<String>),
    Require(String),
    Condition(String, bool),
    Activate(Operand, Operand, bool),
    Wallet(Operand, Operand, Operand),
    Notify(Operand, String),
    Result(Operand),
    ResultBytes(Vec<u8>),
    Fail(String),
    Spin(u64),
}

/// Compiled block of one contract or function.
#[derive(Debug, Clone)]
pub struct ScriptBlock {
    name: String,
    methods: BTreeMap<String, Vec<Statement>>,
}

impl ScriptBlock {
    /// Name as written in the source.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

// =============================================================================
// INTERPRETER
// =============================================================================

/// Reference interpreter for the script language.
#[derive(Debug, Clone, Default)]
pub struct ScriptInterpreter {
    system_source: String,
}

impl ScriptInterpreter {
    /// Interpreter with the default system functions.
    #[must_use]
    pub fn new() -> Self {
        Self {
            system_source: SYSTEM_FUNCTIONS.to_string(),
        }
    }

    /// Interpreter with custom system functions.
    #[must_use]
    pub fn with_system_functions(source: impl Into<String>) -> Self {
        Self {
            system_source: source.into(),
        }
    }

    fn exec(
        &self,
        host: &mut dyn ContractHost,
        statement: &Statement,
        clock: &Clock,
    ) -> Result<(), RuntimeError> {
        match statement {
            Statement::Charge(amount) => host.charge(*amount)?,
            Statement::Set(name, value) => {
                let value = resolve(host.env(), value)?;
                host.env_mut().set(EnvKey::Field(name.clone()), value);
            }
            Statement::Call(target, fields) => {
                let fields = resolve_pairs(host.env(), fields)?;
                let ret = host.call_contract(target, fields)?;
                host.env_mut().set(EnvKey::Field("ret".into()), ret);
            }
            Statement::Insert(table, values) => {
                let values = resolve_pairs(host.env(), values)?;
                let id = host.db_insert(table, values)?;
                host.env_mut().set(EnvKey::Field("last_id".into()), id);
            }
            Statement::Update(table, id, values) => {
                let id = resolve_int(host.env(), id)?;
                let values = resolve_pairs(host.env(), values)?;
                host.db_update(table, id, values)?;
            }
            Statement::Select(table, id, columns) => {
                let id = resolve_int(host.env(), id)?;
                let row = host.db_select(table, id, columns)?;
                host.env_mut()
                    .set(EnvKey::Field("row".into()), Value::Map(row));
            }
            Statement::Require(expr) => {
                let ecosystem = host
                    .env()
                    .get(&EnvKey::EcosystemId)
                    .and_then(Value::as_int)
                    .unwrap_or_default();
                if !self.eval_boolean(expr, ecosystem, host.env())? {
                    return Err(RuntimeError::Domain(format!("condition failed: {expr}")));
                }
            }
            Statement::Condition(param, use_conditions) => {
                host.check_condition(param, *use_conditions)?;
            }
            Statement::Activate(table_id, ecosystem, active) => {
                let table_id = resolve_int(host.env(), table_id)?;
                let ecosystem = resolve_int(host.env(), ecosystem)?;
                host.activate_contract(table_id, ecosystem, *active)?;
            }
            Statement::Wallet(table_id, ecosystem, wallet) => {
                let table_id = resolve_int(host.env(), table_id)?;
                let ecosystem = resolve_int(host.env(), ecosystem)?;
                let wallet = resolve_int(host.env(), wallet)?;
                host.set_contract_wallet(table_id, ecosystem, wallet)?;
            }
            Statement::Notify(key, payload) => {
                let key = resolve_int(host.env(), key)?;
                host.notify(key, payload.clone());
            }
            Statement::Result(value) => {
                let value = resolve(host.env(), value)?;
                host.env_mut().set(EnvKey::Result, value);
            }
            Statement::ResultBytes(bytes) => {
                host.env_mut().set(EnvKey::Result, Value::Bytes(bytes.clone()));
            }
            Statement::Fail(message) => return Err(RuntimeError::Domain(message.clone())),
            Statement::Spin(ms) => {
                let until = Instant::now() + Duration::from_millis(*ms);
                while Instant::now() < until {
                    clock.check()?;
                    std::thread::sleep(Duration::from_millis(1));
                }
            }
        }
        Ok(())
    }
}

impl Interpreter for ScriptInterpreter {
    fn system_functions(&self) -> &str {
        &self.system_source
    }

    fn contract_names(&self, source: &str, ecosystem_id: i64) -> Result<Vec<String>, CompileError> {
        let mut names = Vec::new();
        for (index, line) in source.lines().enumerate() {
            let line = strip_comment(line);
            if let Some(rest) = line.strip_prefix("contract ") {
                let name = header_name(rest, index + 1)?;
                names.push(state_name(ecosystem_id, name));
            }
        }
        Ok(names)
    }

    fn compile(
        &self,
        source: &str,
        owner: &OwnerInfo,
        ignore: &BTreeSet<String>,
    ) -> Result<Vec<CompiledUnit>, CompileError> {
        let parsed = Parser::new(owner.ecosystem_id).parse(source)?;

        let declared: BTreeSet<String> = parsed
            .iter()
            .filter(|unit| unit.kind == UnitKind::Contract)
            .map(|unit| state_name(owner.ecosystem_id, &unit.name))
            .collect();

        let mut seen = BTreeSet::new();
        let mut units = Vec::with_capacity(parsed.len());
        for unit in parsed {
            if !seen.insert(unit.name.clone()) {
                return Err(CompileError::Duplicate(unit.name));
            }
            for target in &unit.used {
                if !declared.contains(target) && !ignore.contains(target) {
                    return Err(CompileError::UnknownObject(target.clone()));
                }
            }
            let block = ScriptBlock {
                name: unit.name.clone(),
                methods: unit.methods,
            };
            units.push(CompiledUnit {
                methods: block.methods.keys().cloned().collect(),
                name: unit.name,
                kind: unit.kind,
                fields: unit.fields,
                used: unit.used,
                program: ProgramHandle::new(block),
            });
        }
        Ok(units)
    }

    fn run(
        &self,
        host: &mut dyn ContractHost,
        program: &ProgramHandle,
        methods: &[&str],
    ) -> Result<(), RuntimeError> {
        let block = program
            .downcast_ref::<ScriptBlock>()
            .ok_or_else(|| RuntimeError::Domain("program was not compiled by this interpreter".into()))?;

        let limit_ms = host
            .env()
            .get(&EnvKey::TimeLimit)
            .and_then(Value::as_int)
            .and_then(|ms| u64::try_from(ms).ok());
        let clock = Clock::start(limit_ms);

        for method in methods {
            let Some(statements) = block.methods.get(*method) else {
                continue;
            };
            for statement in statements {
                clock.check()?;
                host.charge(1)?;
                self.exec(host, statement, &clock)?;
            }
        }
        Ok(())
    }

    fn eval_boolean(
        &self,
        expr: &str,
        _ecosystem_id: i64,
        env: &Environment,
    ) -> Result<bool, EvalError> {
        let tokens = tokenize(expr)?;
        if tokens.is_empty() {
            return Err(EvalError("empty expression".into()));
        }
        let mut eval = Evaluator {
            tokens: &tokens,
            pos: 0,
            env,
        };
        let value = eval.or_expr()?;
        if eval.pos != tokens.len() {
            return Err(EvalError(format!("unexpected token in {expr}")));
        }
        Ok(value.is_truthy())
    }
}

// =============================================================================
// RUNTIME HELPERS
// =============================================================================

struct Clock {
    started: Instant,
    limit_ms: Option<u64>,
}

impl Clock {
    fn start(limit_ms: Option<u64>) -> Self {
        Self {
            started: Instant::now(),
            limit_ms,
        }
    }

    fn check(&self) -> Result<(), RuntimeError> {
        let Some(max_ms) = self.limit_ms else {
            return Ok(());
        };
        let elapsed_ms = u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX);
        if elapsed_ms > max_ms {
            return Err(RuntimeError::Timeout { elapsed_ms, max_ms });
        }
        Ok(())
    }
}

fn resolve(env: &Environment, operand: &Operand) -> Result<Value, RuntimeError> {
    match operand {
        Operand::Int(v) => Ok(Value::Int(*v)),
        Operand::Text(s) => Ok(Value::Str(s.clone())),
        Operand::Var(name) => env
            .get_by_name(name)
            .cloned()
            .ok_or_else(|| RuntimeError::Domain(format!("unknown variable ${name}"))),
    }
}

fn resolve_int(env: &Environment, operand: &Operand) -> Result<i64, RuntimeError> {
    let value = resolve(env, operand)?;
    value
        .as_int()
        .ok_or_else(|| RuntimeError::Domain(format!("{value} is not an integer")))
}

fn resolve_pairs(env: &Environment, pairs: &[(String, Operand)]) -> Result<Row, RuntimeError> {
    pairs
        .iter()
        .map(|(name, operand)| Ok((name.clone(), resolve(env, operand)?)))
        .collect()
}

// =============================================================================
// PARSER
// =============================================================================

struct ParsedUnit {
    name: String,
    kind: UnitKind,
    methods: BTreeMap<String, Vec<Statement>>,
    fields: Vec<ContractField>,
    used: BTreeSet<String>,
}

enum Block {
    Top,
    Contract,
    Data,
    Method(String),
}

struct Parser {
    ecosystem_id: i64,
}

impl Parser {
    fn new(ecosystem_id: i64) -> Self {
        Self { ecosystem_id }
    }

    fn parse(&self, source: &str) -> Result<Vec<ParsedUnit>, CompileError> {
        let mut units: Vec<ParsedUnit> = Vec::new();
        let mut block = Block::Top;

        for (index, raw) in source.lines().enumerate() {
            let line_no = index + 1;
            let line = strip_comment(raw);
            if line.is_empty() {
                continue;
            }
            let syntax = |message: &str| CompileError::Syntax {
                line: line_no,
                message: message.to_string(),
            };

            block = match block {
                Block::Top => {
                    let (kind, rest) = if let Some(rest) = line.strip_prefix("contract ") {
                        (UnitKind::Contract, rest)
                    } else if let Some(rest) = line.strip_prefix("func ") {
                        (UnitKind::Function, rest)
                    } else {
                        return Err(syntax("expected `contract` or `func`"));
                    };
                    let name = header_name(rest, line_no)?;
                    units.push(ParsedUnit {
                        name: name.to_string(),
                        kind,
                        methods: BTreeMap::new(),
                        fields: Vec::new(),
                        used: BTreeSet::new(),
                    });
                    match kind {
                        UnitKind::Contract => Block::Contract,
                        UnitKind::Function => Block::Method("body".to_string()),
                    }
                }
                Block::Contract => {
                    if line == "}" {
                        Block::Top
                    } else if line == "data {" {
                        Block::Data
                    } else {
                        let name = header_name(line, line_no)?;
                        let unit = units.last_mut().ok_or_else(|| syntax("no open contract"))?;
                        if unit.methods.insert(name.to_string(), Vec::new()).is_some() {
                            return Err(CompileError::Duplicate(name.to_string()));
                        }
                        Block::Method(name.to_string())
                    }
                }
                Block::Data => {
                    if line == "}" {
                        Block::Contract
                    } else {
                        let unit = units.last_mut().ok_or_else(|| syntax("no open contract"))?;
                        unit.fields.push(parse_field(line, line_no)?);
                        Block::Data
                    }
                }
                Block::Method(method) => {
                    let unit = units.last_mut().ok_or_else(|| syntax("no open block"))?;
                    if line == "}" {
                        unit.methods.entry(method).or_default();
                        if unit.kind == UnitKind::Function {
                            Block::Top
                        } else {
                            Block::Contract
                        }
                    } else {
                        let statement = self.parse_statement(line, line_no)?;
                        if let Statement::Call(target, _) = &statement {
                            unit.used.insert(target.clone());
                        }
                        unit.methods.entry(method.clone()).or_default().push(statement);
                        Block::Method(method)
                    }
                }
            };
        }

        if !matches!(block, Block::Top) {
            return Err(CompileError::Syntax {
                line: source.lines().count(),
                message: "unexpected end of source".into(),
            });
        }
        Ok(units)
    }

    fn parse_statement(&self, line: &str, line_no: usize) -> Result<Statement, CompileError> {
        let syntax = |message: String| CompileError::Syntax {
            line: line_no,
            message,
        };
        let (keyword, rest) = line.split_once(' ').unwrap_or((line, ""));
        let rest = rest.trim();
        let args: Vec<&str> = rest.split_whitespace().collect();
        let arg = |i: usize| {
            args.get(i)
                .copied()
                .ok_or_else(|| syntax(format!("`{keyword}` expects more arguments")))
        };

        let statement = match keyword {
            "charge" => Statement::Charge(
                arg(0)?
                    .parse()
                    .map_err(|_| syntax("charge expects an integer".into()))?,
            ),
            "set" => Statement::Set(arg(0)?.to_string(), operand(arg(1)?)),
            "call" => Statement::Call(
                state_name(self.ecosystem_id, arg(0)?),
                parse_pairs(&args[1..], line_no)?,
            ),
            "insert" => Statement::Insert(arg(0)?.to_string(), parse_pairs(&args[1..], line_no)?),
            "update" => Statement::Update(
                arg(0)?.to_string(),
                operand(arg(1)?),
                parse_pairs(&args[2..], line_no)?,
            ),
            "select" => Statement::Select(
                arg(0)?.to_string(),
                operand(arg(1)?),
                args.get(2)
                    .map(|cols| cols.split(',').map(str::to_string).collect())
                    .unwrap_or_default(),
            ),
            "require" if !rest.is_empty() => Statement::Require(rest.to_string()),
            "condition" => Statement::Condition(
                arg(0)?.to_string(),
                args.get(1).is_some_and(|flag| *flag == "conditions"),
            ),
            "activate" => Statement::Activate(
                operand(arg(0)?),
                operand(arg(1)?),
                match arg(2)? {
                    "true" => true,
                    "false" => false,
                    other => return Err(syntax(format!("expected true or false, got {other}"))),
                },
            ),
            "wallet" => Statement::Wallet(operand(arg(0)?), operand(arg(1)?), operand(arg(2)?)),
            "notify" => {
                let (key, payload) = rest.split_once(' ').unwrap_or((rest, ""));
                Statement::Notify(operand(key), payload.trim().to_string())
            }
            "result" => {
                if args.len() == 1 {
                    Statement::Result(operand(args[0]))
                } else {
                    Statement::Result(Operand::Text(rest.to_string()))
                }
            }
            "result_hex" => Statement::ResultBytes(
                hex::decode(arg(0)?).map_err(|err| syntax(format!("invalid hex: {err}")))?,
            ),
            "fail" => Statement::Fail(rest.to_string()),
            "spin" => Statement::Spin(
                arg(0)?
                    .parse()
                    .map_err(|_| syntax("spin expects milliseconds".into()))?,
            ),
            other => return Err(syntax(format!("unknown statement `{other}`"))),
        };
        Ok(statement)
    }
}

fn strip_comment(line: &str) -> &str {
    line.split("//").next().unwrap_or_default().trim()
}

fn header_name(rest: &str, line: usize) -> Result<&str, CompileError> {
    let name = rest
        .strip_suffix('{')
        .map(str::trim)
        .filter(|name| !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_'))
        .ok_or_else(|| CompileError::Syntax {
            line,
            message: format!("expected `NAME {{`, got `{rest}`"),
        })?;
    Ok(name)
}

fn parse_field(line: &str, line_no: usize) -> Result<ContractField, CompileError> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    match parts.as_slice() {
        [name, type_name] => Ok(ContractField {
            name: (*name).to_string(),
            type_name: (*type_name).to_string(),
            optional: false,
        }),
        [name, type_name, "optional"] => Ok(ContractField {
            name: (*name).to_string(),
            type_name: (*type_name).to_string(),
            optional: true,
        }),
        _ => Err(CompileError::Syntax {
            line: line_no,
            message: format!("invalid field declaration `{line}`"),
        }),
    }
}

fn operand(token: &str) -> Operand {
    if let Some(name) = token.strip_prefix('$') {
        Operand::Var(name.to_string())
    } else if let Ok(v) = token.parse() {
        Operand::Int(v)
    } else {
        Operand::Text(token.to_string())
    }
}

fn parse_pairs(args: &[&str], line: usize) -> Result<Vec<(String, Operand)>, CompileError> {
    args.iter()
        .map(|arg| {
            let (name, value) = arg.split_once('=').ok_or_else(|| CompileError::Syntax {
                line,
                message: format!("expected name=value, got `{arg}`"),
            })?;
            Ok((name.to_lowercase(), operand(value)))
        })
        .collect()
}

// =============================================================================
// BOOLEAN EXPRESSIONS
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Token {
    LParen,
    RParen,
    Not,
    And,
    Or,
    Cmp(&'static str),
    Var(String),
    Int(i64),
    Str(String),
    Word(String),
}

fn tokenize(expr: &str) -> Result<Vec<Token>, EvalError> {
    let chars: Vec<char> = expr.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();
        match c {
            ' ' | '\t' | '\n' | '\r' => i += 1,
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '&' if next == Some('&') => {
                tokens.push(Token::And);
                i += 2;
            }
            '|' if next == Some('|') => {
                tokens.push(Token::Or);
                i += 2;
            }
            '=' if next == Some('=') => {
                tokens.push(Token::Cmp("=="));
                i += 2;
            }
            '!' if next == Some('=') => {
                tokens.push(Token::Cmp("!="));
                i += 2;
            }
            '!' => {
                tokens.push(Token::Not);
                i += 1;
            }
            '<' | '>' => {
                let op = match (c, next) {
                    ('<', Some('=')) => "<=",
                    ('>', Some('=')) => ">=",
                    ('<', _) => "<",
                    _ => ">",
                };
                tokens.push(Token::Cmp(op));
                i += op.len();
            }
            '"' | '\'' => {
                let end = chars[i + 1..]
                    .iter()
                    .position(|&ch| ch == c)
                    .ok_or_else(|| EvalError(format!("unterminated string in {expr}")))?;
                tokens.push(Token::Str(chars[i + 1..i + 1 + end].iter().collect()));
                i += end + 2;
            }
            _ if c == '$' || c == '-' || c.is_alphanumeric() || c == '_' => {
                let start = i;
                i += 1;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                if let Some(name) = word.strip_prefix('$') {
                    tokens.push(Token::Var(name.to_string()));
                } else if let Ok(v) = word.parse() {
                    tokens.push(Token::Int(v));
                } else {
                    tokens.push(Token::Word(word));
                }
            }
            other => return Err(EvalError(format!("unexpected character {other:?} in {expr}"))),
        }
    }
    Ok(tokens)
}

struct Evaluator<'a> {
    tokens: &'a [Token],
    pos: usize,
    env: &'a Environment,
}

impl Evaluator<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<&Token> {
        let token = self.tokens.get(self.pos);
        self.pos += 1;
        token
    }

    fn or_expr(&mut self) -> Result<Value, EvalError> {
        let mut value = self.and_expr()?;
        while self.peek() == Some(&Token::Or) {
            self.pos += 1;
            let rhs = self.and_expr()?;
            value = Value::Bool(value.is_truthy() || rhs.is_truthy());
        }
        Ok(value)
    }

    fn and_expr(&mut self) -> Result<Value, EvalError> {
        let mut value = self.unary()?;
        while self.peek() == Some(&Token::And) {
            self.pos += 1;
            let rhs = self.unary()?;
            value = Value::Bool(value.is_truthy() && rhs.is_truthy());
        }
        Ok(value)
    }

    fn unary(&mut self) -> Result<Value, EvalError> {
        if self.peek() == Some(&Token::Not) {
            self.pos += 1;
            return Ok(Value::Bool(!self.unary()?.is_truthy()));
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Value, EvalError> {
        let lhs = self.primary()?;
        let Some(Token::Cmp(op)) = self.peek().cloned() else {
            return Ok(lhs);
        };
        self.pos += 1;
        let rhs = self.primary()?;
        compare(&lhs, op, &rhs).map(Value::Bool)
    }

    fn primary(&mut self) -> Result<Value, EvalError> {
        let env = self.env;
        match self.next().cloned() {
            Some(Token::LParen) => {
                let value = self.or_expr()?;
                if self.next() != Some(&Token::RParen) {
                    return Err(EvalError("missing closing parenthesis".into()));
                }
                Ok(value)
            }
            Some(Token::Int(v)) => Ok(Value::Int(v)),
            Some(Token::Str(s)) => Ok(Value::Str(s)),
            Some(Token::Var(name)) => env
                .get_by_name(&name)
                .cloned()
                .ok_or_else(|| EvalError(format!("unknown variable ${name}"))),
            Some(Token::Word(word)) => match word.as_str() {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                _ => Err(EvalError(format!("unknown identifier {word}"))),
            },
            Some(token) => Err(EvalError(format!("unexpected token {token:?}"))),
            None => Err(EvalError("unexpected end of expression".into())),
        }
    }
}

fn compare(lhs: &Value, op: &str, rhs: &Value) -> Result<bool, EvalError> {
    let numeric = match (lhs, rhs) {
        (Value::Bool(_), _) | (_, Value::Bool(_)) => None,
        _ => lhs.as_int().zip(rhs.as_int()),
    };
    if let Some((a, b)) = numeric {
        return Ok(match op {
            "==" => a == b,
            "!=" => a != b,
            "<" => a < b,
            "<=" => a <= b,
            ">" => a > b,
            _ => a >= b,
        });
    }
    match op {
        "==" => Ok(lhs.to_string() == rhs.to_string()),
        "!=" => Ok(lhs.to_string() != rhs.to_string()),
        _ => Err(EvalError(format!("cannot order {lhs} and {rhs}"))),
    }
}

// =============================================================================
// TESTS
// =============================================================================
