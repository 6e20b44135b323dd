//! Grammar model and builder
//!
//! A grammar is a list of non-terminals, each with two rule lists: normal
//! rules and directly left-recursive rules (the recursive occurrence of the
//! non-terminal itself is implicit and not stored in the rule). A rule is a
//! sequence of elements; an element matches a non-terminal, a character, a
//! character set, end of input, an inline grouping of rules, or a user
//! terminal scanner. Elements carry modifiers (`optional`, `sequence`,
//! `back_tracking`, `avoid`, a chain rule between sequence items) and a
//! fixed vocabulary of hooks that fold parsed pieces into the rule result.
//!
//! Grammars are built once at startup through [`GrammarBuilder`], which
//! resolves non-terminal references by name with find-or-add semantics, so
//! forward references work.

use hashbrown::HashMap;

use crate::ast::{TreeTag, Value, LIST_NAME};
use crate::char_set::CharSet;
use crate::intern::{Interner, Name};

/// Handle to a non-terminal in a [`Grammar`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NtId(pub(crate) u32);

/// A user terminal scanner: given the remaining input, return the number of
/// bytes consumed (non-zero) and the produced value.
pub type TerminalFn = fn(&[u8]) -> Option<(usize, Value)>;

/// Hook applied when a character element matches, folding the character
/// into the result accumulated so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharHook {
    /// Discard the character, keep the previous result
    None,
    /// Decimal accumulator of the tutorial `number` grammar
    Number,
    /// Identifier scanner
    Ident,
    /// Integer-literal scanner
    Int,
    /// Character literal, as-is
    CharNormal,
    /// Character literal, after a backslash
    CharEscaped,
    /// String literal, as-is
    StrNormal,
    /// String literal, after a backslash
    StrEscaped,
    /// First digit of a 3-digit octal string escape
    StrOctal1,
    /// Second digit of a 3-digit octal string escape
    StrOctal2,
    /// Third digit of a 3-digit octal string escape
    StrOctal3,
}

/// Hook combining an element's result with the previous result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddHook {
    /// Discard the element result, keep the previous result
    None,
    /// Append the element result to the accumulated child list
    Child,
    /// Replace the accumulator with the element result
    TakeChild,
}

/// Hook applied when an optional element is skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipHook {
    /// Fall back to the add hook with an empty value, else pass through
    None,
    /// Pass the previous result through unchanged
    PassPrev,
}

/// How the accumulator of a sequence element is seeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeginSeq {
    /// Start from an empty value
    Empty,
    /// Start from the previous result
    PassPrev,
}

/// Hook combining a finished sequence with the previous result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SeqHook {
    /// Discard the sequence, continue with an empty value
    None,
    /// Use the sequence accumulator as the result
    UseSeq,
    /// Wrap the sequence children in a list tree with the given tag and
    /// append it to the previous child list
    AsList(TreeTag),
}

/// Condition evaluated on an element result before it is combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    /// Always passes
    None,
    /// The result must be an identifier with exactly this name
    IsKeyword(Name),
    /// The result must be an identifier that is not a keyword
    NotKeyword,
}

/// Hook stamping the element's start position onto the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PosHook {
    /// No stamping
    None,
    /// Stamp an in-flight identifier scan
    Ident,
    /// Stamp an in-flight integer scan, first stamp wins
    Int,
    /// Start a character-literal scan at this position
    Char,
    /// Start a string-literal scan at this position unless one is running
    Str,
    /// Stamp a finished node
    Node,
}

/// Hook computing a rule's final result from its accumulator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EndHook {
    /// The accumulator is the result
    None,
    /// Wrap the accumulated children in a tree
    MakeTree(TreeTag),
    /// Like [`MakeTree`](Self::MakeTree), but a single list-tree child is
    /// unwrapped and its children reused
    MakeTreeFromList(TreeTag),
    /// Unwrap a single-child list and surface the child
    PassTree,
    /// Intern the scanned identifier and build an identifier node
    IdentTree,
    /// Build a character node from the scan
    CharTree,
    /// Copy the scanned bytes and build a string node
    StringTree,
    /// Build an integer node from the scan
    IntTree,
    /// Build an integer node from the `number` accumulator
    NumberTree,
}

/// Seed transformation for a left-recursive rule: how the already parsed
/// left result enters the rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecStart {
    /// Discard the left result, start from an empty accumulator
    Discard,
    /// Seed the child list with the left result
    SeedChild,
}

/// What an element matches.
#[derive(Debug)]
pub enum ElemKind {
    /// A non-terminal reference
    NonTerm(NtId),
    /// A literal character
    Char(u8),
    /// A character set
    Set(CharSet),
    /// End of input
    End,
    /// Inline anonymous rules; the first match wins
    Group(Vec<Rule>),
    /// A user terminal scanner
    Terminal(TerminalFn),
}

/// One element of a rule.
#[derive(Debug)]
pub struct Element {
    /// What the element matches
    pub kind: ElemKind,
    /// The element may be absent
    pub optional: bool,
    /// The element repeats
    pub sequence: bool,
    /// Sequence items are parsed with full back-tracking
    pub back_tracking: bool,
    /// Prefer the shorter or absent form first
    pub avoid: bool,
    /// Elements parsed between sequence items, results discarded
    pub chain: Vec<Element>,
    /// Character fold hook
    pub add_char: CharHook,
    /// Result condition
    pub condition: Condition,
    /// Result fold hook
    pub add: AddHook,
    /// Skip hook for optional elements
    pub add_skip: SkipHook,
    /// Sequence accumulator seed
    pub begin_seq: BeginSeq,
    /// Sequence fold hook
    pub add_seq: SeqHook,
    /// Position stamp hook
    pub set_pos: PosHook,
    /// Override text for expectation reports
    pub expect_msg: Option<&'static str>,
}

impl Element {
    fn new(kind: ElemKind) -> Self {
        Self {
            kind,
            optional: false,
            sequence: false,
            back_tracking: false,
            avoid: false,
            chain: Vec::new(),
            add_char: CharHook::None,
            condition: Condition::None,
            add: AddHook::None,
            add_skip: SkipHook::None,
            begin_seq: BeginSeq::Empty,
            add_seq: SeqHook::None,
            set_pos: PosHook::None,
            expect_msg: None,
        }
    }
}

/// One rule of a non-terminal.
#[derive(Debug)]
pub struct Rule {
    /// The elements in match order
    pub elements: Vec<Element>,
    /// End hook computing the rule result
    pub end: EndHook,
    /// Seed transformation, meaningful for left-recursive rules only
    pub rec_start: RecStart,
}

/// A non-terminal.
#[derive(Debug)]
pub struct NonTerm {
    /// Interned name
    pub name: Name,
    /// Rules tried in declaration order
    pub normal: Vec<Rule>,
    /// Left-recursive rules applied by fixpoint iteration
    pub recursive: Vec<Rule>,
}

/// A complete grammar.
#[derive(Debug, Default)]
pub struct Grammar {
    nts: Vec<NonTerm>,
    index: HashMap<Name, NtId>,
}

impl Grammar {
    /// Create an empty grammar
    pub fn new() -> Self {
        Self {
            nts: Vec::with_capacity(64),
            index: HashMap::with_capacity(64),
        }
    }

    /// Find a non-terminal by name, or add an empty one. References to
    /// names that are never defined stay empty and simply fail to parse.
    pub fn find_or_add(&mut self, name: Name) -> NtId {
        if let Some(&id) = self.index.get(&name) {
            return id;
        }
        let id = NtId(self.nts.len() as u32);
        self.nts.push(NonTerm {
            name,
            normal: Vec::new(),
            recursive: Vec::new(),
        });
        self.index.insert(name, id);
        id
    }

    /// Look up a non-terminal by name
    pub fn find(&self, name: Name) -> Option<NtId> {
        self.index.get(&name).copied()
    }

    /// Borrow a non-terminal
    #[inline]
    pub fn nt(&self, id: NtId) -> &NonTerm {
        &self.nts[id.0 as usize]
    }

    /// Number of non-terminals
    #[inline]
    pub fn len(&self) -> usize {
        self.nts.len()
    }

    /// Whether the grammar has no non-terminals
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nts.is_empty()
    }
}

// ======================================================================
// Builder
// ======================================================================

/// Builds a [`Grammar`], interning names as it goes.
pub struct GrammarBuilder<'i> {
    pub(crate) interner: &'i mut Interner,
    grammar: Grammar,
}

impl<'i> GrammarBuilder<'i> {
    /// Create a builder that interns names into `interner`
    pub fn new(interner: &'i mut Interner) -> Self {
        Self {
            interner,
            grammar: Grammar::new(),
        }
    }

    /// Define a non-terminal. The closure adds its rules.
    pub fn nt(&mut self, name: &str, f: impl FnOnce(&mut NtBuilder<'_, 'i>)) {
        let name = self.interner.intern(name);
        let id = self.grammar.find_or_add(name);
        let mut nt = NtBuilder {
            gb: &mut *self,
            normal: Vec::new(),
            recursive: Vec::new(),
        };
        f(&mut nt);
        let NtBuilder { normal, recursive, .. } = nt;
        let target = &mut self.grammar.nts[id.0 as usize];
        target.normal.extend(normal);
        target.recursive.extend(recursive);
    }

    /// Finish building
    pub fn finish(self) -> Grammar {
        self.grammar
    }

    fn nt_ref(&mut self, name: &str) -> NtId {
        let name = self.interner.intern(name);
        self.grammar.find_or_add(name)
    }
}

/// Adds rules to one non-terminal.
pub struct NtBuilder<'b, 'i> {
    gb: &'b mut GrammarBuilder<'i>,
    normal: Vec<Rule>,
    recursive: Vec<Rule>,
}

impl<'b, 'i> NtBuilder<'b, 'i> {
    /// Add a normal rule
    pub fn rule(&mut self, f: impl FnOnce(&mut RuleBuilder<'_, 'i>)) {
        let rule = build_rule(self.gb, RecStart::Discard, f);
        self.normal.push(rule);
    }

    /// Add a left-recursive rule whose seed is the already parsed left
    /// result as the first accumulated child
    pub fn rec_rule(&mut self, f: impl FnOnce(&mut RuleBuilder<'_, 'i>)) {
        let rule = build_rule(self.gb, RecStart::SeedChild, f);
        self.recursive.push(rule);
    }
}

fn build_rule<'i>(
    gb: &mut GrammarBuilder<'i>,
    rec_start: RecStart,
    f: impl FnOnce(&mut RuleBuilder<'_, 'i>),
) -> Rule {
    let mut rb = RuleBuilder {
        gb,
        elements: Vec::new(),
        end: EndHook::None,
    };
    f(&mut rb);
    let RuleBuilder { elements, end, .. } = rb;
    Rule {
        elements,
        end,
        rec_start,
    }
}

/// Adds elements and hooks to one rule. Modifier methods apply to the most
/// recently added element.
pub struct RuleBuilder<'b, 'i> {
    gb: &'b mut GrammarBuilder<'i>,
    elements: Vec<Element>,
    end: EndHook,
}

impl<'b, 'i> RuleBuilder<'b, 'i> {
    fn push(&mut self, kind: ElemKind) -> &mut Element {
        self.elements.push(Element::new(kind));
        self.elements.last_mut().expect("just pushed")
    }

    fn last(&mut self) -> &mut Element {
        self.elements.last_mut().expect("no element to modify")
    }

    // -- elements ------------------------------------------------------

    /// Reference a non-terminal, appending its result to the child list
    pub fn nt(&mut self, name: &str) -> &mut Self {
        let id = self.gb.nt_ref(name);
        let e = self.push(ElemKind::NonTerm(id));
        e.add = AddHook::Child;
        self
    }

    /// Reference a non-terminal, taking its result as the accumulator
    pub fn nt_pass(&mut self, name: &str) -> &mut Self {
        let id = self.gb.nt_ref(name);
        let e = self.push(ElemKind::NonTerm(id));
        e.add = AddHook::TakeChild;
        self
    }

    /// Reference a non-terminal and discard its result
    pub fn nt_raw(&mut self, name: &str) -> &mut Self {
        let id = self.gb.nt_ref(name);
        self.push(ElemKind::NonTerm(id));
        self
    }

    /// Skip white space
    pub fn ws(&mut self) -> &mut Self {
        self.nt_raw("white_space")
    }

    /// An identifier that is not a keyword, appended to the child list,
    /// followed by white space
    pub fn ident(&mut self) -> &mut Self {
        let id = self.gb.nt_ref("ident");
        let e = self.push(ElemKind::NonTerm(id));
        e.condition = Condition::NotKeyword;
        e.add = AddHook::Child;
        self.ws()
    }

    /// Like [`ident`](Self::ident) but the identifier may be absent
    pub fn ident_opt(&mut self) -> &mut Self {
        let id = self.gb.nt_ref("ident");
        let e = self.push(ElemKind::NonTerm(id));
        e.condition = Condition::NotKeyword;
        e.add = AddHook::Child;
        e.optional = true;
        self.ws()
    }

    /// A specific keyword (an identifier equal to `word`), result
    /// discarded, followed by white space. Interning the word here is what
    /// marks it as a keyword for the whole compile.
    pub fn keyword(&mut self, word: &str) -> &mut Self {
        let name = self.gb.interner.intern(word);
        self.gb.interner.mark_keyword(name);
        let id = self.gb.nt_ref("ident");
        let e = self.push(ElemKind::NonTerm(id));
        e.condition = Condition::IsKeyword(name);
        self.ws()
    }

    /// A literal character
    pub fn ch(&mut self, c: char) -> &mut Self {
        debug_assert!(c.is_ascii());
        self.push(ElemKind::Char(c as u8));
        self
    }

    /// A literal character followed by white space
    pub fn ch_ws(&mut self, c: char) -> &mut Self {
        self.ch(c);
        self.ws()
    }

    /// A literal character with a fold hook
    pub fn ch_f(&mut self, c: char, hook: CharHook) -> &mut Self {
        debug_assert!(c.is_ascii());
        let e = self.push(ElemKind::Char(c as u8));
        e.add_char = hook;
        self
    }

    /// A character set with a fold hook
    pub fn set(&mut self, set: CharSet, hook: CharHook) -> &mut Self {
        let e = self.push(ElemKind::Set(set));
        e.add_char = hook;
        self
    }

    /// End of input
    pub fn end_of_input(&mut self) -> &mut Self {
        self.push(ElemKind::End);
        self
    }

    /// A user terminal scanner
    pub fn terminal(&mut self, f: TerminalFn) -> &mut Self {
        self.push(ElemKind::Terminal(f));
        self
    }

    /// An inline grouping of rules
    pub fn group(&mut self, f: impl FnOnce(&mut GroupBuilder<'_, 'i>)) -> &mut Self {
        let mut gbuild = GroupBuilder {
            gb: &mut *self.gb,
            rules: Vec::new(),
        };
        f(&mut gbuild);
        let rules = gbuild.rules;
        self.push(ElemKind::Group(rules));
        self
    }

    // -- modifiers, applied to the last element ------------------------

    /// Make the last element optional
    pub fn opt(&mut self) -> &mut Self {
        self.last().optional = true;
        self
    }

    /// Prefer the short or absent form of the last element
    pub fn avoid(&mut self) -> &mut Self {
        self.last().avoid = true;
        self
    }

    /// Parse the last element's sequence with full back-tracking
    pub fn back_tracking(&mut self) -> &mut Self {
        self.last().back_tracking = true;
        self
    }

    /// Make the last element a sequence with explicit seed and fold hooks
    pub fn seq(&mut self, begin: BeginSeq, fold: SeqHook) -> &mut Self {
        let e = self.last();
        e.sequence = true;
        e.begin_seq = begin;
        e.add_seq = fold;
        self
    }

    /// Make the last element a bare sequence whose result is discarded
    pub fn seq_plain(&mut self) -> &mut Self {
        self.seq(BeginSeq::Empty, SeqHook::None)
    }

    /// Make the last element a sequence collected into a list tree whose
    /// items the unparser separates with `sep`
    pub fn seq_list(&mut self, sep: &'static str) -> &mut Self {
        self.seq(BeginSeq::Empty, SeqHook::AsList(TreeTag::new(LIST_NAME, sep)))
    }

    /// Set a chain rule parsed between the last element's sequence items
    pub fn chain(&mut self, f: impl FnOnce(&mut RuleBuilder<'_, 'i>)) -> &mut Self {
        let mut cb = RuleBuilder {
            gb: &mut *self.gb,
            elements: Vec::new(),
            end: EndHook::None,
        };
        f(&mut cb);
        let elements = cb.elements;
        self.last().chain = elements;
        self
    }

    /// Append the last element's result to the child list
    pub fn add_child(&mut self) -> &mut Self {
        self.last().add = AddHook::Child;
        self
    }

    /// Set the skip hook of the last element
    pub fn skip(&mut self, hook: SkipHook) -> &mut Self {
        self.last().add_skip = hook;
        self
    }

    /// Set the position stamp hook of the last element
    pub fn pos(&mut self, hook: PosHook) -> &mut Self {
        self.last().set_pos = hook;
        self
    }

    /// Set the expectation text of the last element
    pub fn expect(&mut self, msg: &'static str) -> &mut Self {
        self.last().expect_msg = Some(msg);
        self
    }

    // -- rule end hooks ------------------------------------------------

    /// Finish the rule by wrapping the children in a tree
    pub fn tree(&mut self, name: &'static str, fmt: &'static str) {
        self.end = EndHook::MakeTree(TreeTag::new(name, fmt));
    }

    /// Finish the rule by wrapping the children in a tree with a shared tag
    pub fn tree_tag(&mut self, tag: TreeTag) {
        self.end = EndHook::MakeTree(tag);
    }

    /// Finish the rule with list-flattening tree construction
    pub fn tree_from_list(&mut self, name: &'static str, fmt: &'static str) {
        self.end = EndHook::MakeTreeFromList(TreeTag::new(name, fmt));
    }

    /// Finish the rule with list-flattening tree construction, shared tag
    pub fn tree_from_list_tag(&mut self, tag: TreeTag) {
        self.end = EndHook::MakeTreeFromList(tag);
    }

    /// Finish the rule by surfacing the single accumulated child
    pub fn pass(&mut self) {
        self.end = EndHook::PassTree;
    }

    /// Finish the rule with an explicit end hook
    pub fn end_hook(&mut self, end: EndHook) {
        self.end = end;
    }
}

/// Adds rules to a grouping element.
pub struct GroupBuilder<'b, 'i> {
    gb: &'b mut GrammarBuilder<'i>,
    rules: Vec<Rule>,
}

impl<'b, 'i> GroupBuilder<'b, 'i> {
    /// Add a rule to the grouping
    pub fn rule(&mut self, f: impl FnOnce(&mut RuleBuilder<'_, 'i>)) {
        let rule = build_rule(self.gb, RecStart::Discard, f);
        self.rules.push(rule);
    }
}
