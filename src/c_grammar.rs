//! The C + TinyCoPoOS grammar
//!
//! A conventional C89-shaped grammar: a precedence ladder for expressions,
//! declarations with struct/union/enum, new-style and K&R function
//! definitions, and statements. On top of that sit the cooperative-task
//! extensions: the `task` storage class and the `queue for`, `poll` /
//! `at most`, `timer`, and `every … start` statements.
//!
//! Keywords are recognized at the `ident` layer: a keyword element matches
//! `ident` and then checks the result against the interned keyword name.
//! The `avoid` and `back_tracking` annotations below are load-bearing:
//! they disambiguate declarations from expressions and parameter lists
//! from parenthesized declarators.

use crate::ast::{ASSIGNMENT, ASSIGN_OP, BODY, CALL, DECL, DECLARATION, DECL_INIT, INIT, SEMI};
use crate::grammar::{Grammar, GrammarBuilder};
use crate::intern::Interner;
use crate::tokens;

/// Build the complete grammar, interning keywords into `interner`.
pub fn c_grammar(interner: &mut Interner) -> Grammar {
    let mut b = GrammarBuilder::new(interner);
    tokens::install_all(&mut b);
    expressions(&mut b);
    declarations(&mut b);
    statements(&mut b);

    b.nt("root", |nt| {
        nt.rule(|r| {
            r.ws();
            r.group(|g| {
                g.rule(|r| {
                    r.nt("declaration");
                });
            })
            .seq_list("")
            .opt();
            r.end_of_input();
            r.pass();
        });
    });

    b.finish()
}

fn expressions(b: &mut GrammarBuilder<'_>) {
    b.nt("primary_expr", |nt| {
        nt.rule(|r| {
            r.ident();
            r.pass();
        });
        nt.rule(|r| {
            r.nt_pass("int");
            r.ws();
        });
        nt.rule(|r| {
            r.nt_pass("double");
            r.ws();
        });
        nt.rule(|r| {
            r.nt_pass("char");
            r.ws();
        });
        nt.rule(|r| {
            r.nt_pass("string");
            r.ws();
        });
        nt.rule(|r| {
            r.ch_ws('(');
            r.nt("expr");
            r.ch_ws(')');
            r.tree("brackets", "(%*)");
        });
    });

    b.nt("postfix_expr", |nt| {
        nt.rule(|r| {
            r.nt_pass("primary_expr");
        });
        nt.rec_rule(|r| {
            r.ch_ws('[');
            r.nt("expr");
            r.ch_ws(']');
            r.tree("arrayexp", "%*[%*]");
        });
        nt.rec_rule(|r| {
            r.ch_ws('(');
            r.nt("assignment_expr").seq_list(", ").chain(|c| {
                c.ch_ws(',');
            }).opt();
            r.ch_ws(')');
            r.tree_tag(CALL);
        });
        nt.rec_rule(|r| {
            r.ch_ws('.');
            r.ident();
            r.tree("field", "%*.%*");
        });
        nt.rec_rule(|r| {
            r.ch('-');
            r.ch_ws('>');
            r.ident();
            r.tree("fieldderef", "%*->%*");
        });
        nt.rec_rule(|r| {
            r.ch('+');
            r.ch_ws('+');
            r.tree("post_inc", "%*++");
        });
        nt.rec_rule(|r| {
            r.ch('-');
            r.ch_ws('-');
            r.tree("post_dec", "%*--");
        });
    });

    b.nt("unary_expr", |nt| {
        nt.rule(|r| {
            r.ch('+');
            r.ch_ws('+');
            r.nt("unary_expr");
            r.tree("pre_inc", "++%*");
        });
        nt.rule(|r| {
            r.ch('-');
            r.ch_ws('-');
            r.nt("unary_expr");
            r.tree("pre_dec", "--%*");
        });
        nt.rule(|r| {
            r.ch_ws('&');
            r.nt("cast_expr");
            r.tree("address_of", "&%*");
        });
        nt.rule(|r| {
            r.ch_ws('*');
            r.nt("cast_expr");
            r.tree("deref", "*%*");
        });
        nt.rule(|r| {
            r.ch_ws('+');
            r.nt("cast_expr");
            r.tree("plus", "+%*");
        });
        nt.rule(|r| {
            r.ch_ws('-');
            r.nt("cast_expr");
            r.tree("min", "-%*");
        });
        nt.rule(|r| {
            r.ch_ws('~');
            r.nt("cast_expr");
            r.tree("invert", "~%*");
        });
        nt.rule(|r| {
            r.ch_ws('!');
            r.nt("cast_expr");
            r.tree("not", "!%*");
        });
        nt.rule(|r| {
            r.keyword("sizeof");
            r.ch_ws('(');
            r.nt("sizeof_type");
            r.ch_ws(')');
            r.tree("sizeof", "sizeof(%*)");
        });
        nt.rule(|r| {
            r.keyword("sizeof");
            r.nt("unary_expr");
            r.tree("sizeof_expr", "sizeof(%*)");
        });
        nt.rule(|r| {
            r.nt_pass("postfix_expr");
        });
    });

    b.nt("sizeof_type", |nt| {
        for kw in ["char", "short", "int", "long", "float", "void"] {
            nt.rule(move |r| {
                r.keyword(kw);
                r.tree(kw_tag(kw), kw_tag(kw));
            });
        }
        for kw in ["signed", "unsigned", "const", "volatile"] {
            nt.rule(move |r| {
                r.keyword(kw);
                r.nt("sizeof_type");
                r.tree(kw_tag(kw), kw_fmt(kw));
            });
        }
        nt.rule(|r| {
            r.keyword("double");
            r.nt("sizeof_type").opt();
            r.tree("double", "double%*");
        });
        nt.rule(|r| {
            r.keyword("struct");
            r.ident();
            r.tree("structdecl", "struct %*");
        });
        nt.rule(|r| {
            r.ident();
            r.pass();
        });
        nt.rec_rule(|r| {
            r.ws();
            r.ch_ws('*');
            r.tree("pointdecl", "%**");
        });
    });

    b.nt("cast_expr", |nt| {
        nt.rule(|r| {
            r.ch_ws('(');
            r.nt("abstract_declaration");
            r.ch_ws(')');
            r.nt("cast_expr");
            r.tree("cast", "(%*)%*");
        });
        nt.rule(|r| {
            r.nt_pass("unary_expr");
        });
    });

    // The binary-operator precedence ladder. Each level is one
    // non-terminal whose operators are left-recursive rules.
    let ladder: &[(&str, &str, &[(&str, &'static str, &'static str)])] = &[
        // (level, level below, operators as (token, tree name, format))
        ("l_expr1", "cast_expr", &[
            ("*", "times", "%* * %*"),
            ("/", "div", "%* / %*"),
            ("%", "mod", "%* %% %*"),
        ]),
        ("l_expr2", "l_expr1", &[
            ("+", "add", "%* + %*"),
            ("-", "sub", "%* - %*"),
        ]),
        ("l_expr3", "l_expr2", &[
            ("<<", "ls", "%* << %*"),
            (">>", "rs", "%* >> %*"),
        ]),
        ("l_expr4", "l_expr3", &[
            ("<=", "le", "%* <= %*"),
            (">=", "ge", "%* >= %*"),
            ("<", "lt", "%* < %*"),
            (">", "gt", "%* > %*"),
            ("==", "eq", "%* == %*"),
            ("!=", "ne", "%* != %*"),
        ]),
        ("l_expr5", "l_expr4", &[("^", "bexor", "%* ^ %*")]),
        ("l_expr6", "l_expr5", &[("&", "land", "%* & %*")]),
        ("l_expr7", "l_expr6", &[("|", "lor", "%* | %*")]),
        ("l_expr8", "l_expr7", &[("&&", "and", "%* && %*")]),
        ("l_expr9", "l_expr8", &[("||", "or", "%* || %*")]),
    ];
    for &(level, below, ops) in ladder {
        b.nt(level, |nt| {
            nt.rule(|r| {
                r.nt_pass(below);
            });
            for &(op, name, fmt) in ops.iter() {
                nt.rec_rule(move |r| {
                    r.ws();
                    let bytes = op.as_bytes();
                    for (i, ch) in bytes.iter().enumerate() {
                        if i + 1 == bytes.len() {
                            r.ch_ws(*ch as char);
                        } else {
                            r.ch(*ch as char);
                        }
                    }
                    r.nt(below);
                    r.tree(name, fmt);
                });
            }
        });
    }

    b.nt("conditional_expr", |nt| {
        nt.rule(|r| {
            r.nt("l_expr9");
            r.ws();
            r.ch_ws('?');
            r.nt("l_expr9");
            r.ws();
            r.ch_ws(':');
            r.nt("conditional_expr");
            r.tree("if_expr", "%* ? %* : %*");
        });
        nt.rule(|r| {
            r.nt_pass("l_expr9");
        });
    });

    b.nt("assignment_expr", |nt| {
        nt.rule(|r| {
            r.nt("unary_expr");
            r.ws();
            r.nt("assignment_operator");
            r.ws();
            r.nt("assignment_expr");
            r.tree_tag(ASSIGNMENT);
        });
        nt.rule(|r| {
            r.nt_pass("conditional_expr");
        });
    });

    b.nt("assignment_operator", |nt| {
        nt.rule(|r| {
            r.ch_ws('=');
            r.tree_tag(ASSIGN_OP);
        });
        let compound: &[(&str, &'static str, &'static str)] = &[
            ("*=", "times_ass", "*="),
            ("/=", "div_ass", "/="),
            ("%=", "mod_ass", "%%="),
            ("+=", "add_ass", "+="),
            ("-=", "sub_ass", "-="),
            ("<<=", "sl_ass", "<<="),
            (">>=", "sr_ass", ">>="),
            ("&=", "and_ass", "&="),
            ("|=", "or_ass", "|="),
            ("^=", "exor_ass", "^="),
        ];
        for &(op, name, fmt) in compound {
            nt.rule(move |r| {
                let bytes = op.as_bytes();
                for (i, ch) in bytes.iter().enumerate() {
                    if i + 1 == bytes.len() {
                        r.ch_ws(*ch as char);
                    } else {
                        r.ch(*ch as char);
                    }
                }
                r.tree(name, fmt);
            });
        }
    });

    b.nt("expr", |nt| {
        nt.rule(|r| {
            r.nt("assignment_expr");
            r.pass();
        });
    });

    b.nt("constant_expr", |nt| {
        nt.rule(|r| {
            r.nt_pass("conditional_expr");
        });
    });
}

fn kw_tag(kw: &str) -> &'static str {
    match kw {
        "char" => "char",
        "short" => "short",
        "int" => "int",
        "long" => "long",
        "signed" => "signed",
        "unsigned" => "unsigned",
        "float" => "float",
        "double" => "double",
        "const" => "const",
        "volatile" => "volatile",
        "void" => "void",
        other => panic!("not a type keyword: {other}"),
    }
}

fn kw_fmt(kw: &str) -> &'static str {
    match kw {
        "signed" => "signed%*",
        "unsigned" => "unsigned%*",
        "const" => "const%*",
        "volatile" => "volatile%*",
        other => panic!("no wrapping format for: {other}"),
    }
}

fn declarations(b: &mut GrammarBuilder<'_>) {
    b.nt("declaration", |nt| {
        // Variables with simple type specifiers. The specifier list has
        // the avoid modifier so the declarator is not swallowed as a type.
        nt.rule(|r| {
            r.group(|g| {
                g.rule(|r| {
                    r.nt("storage_class_specifier");
                    r.pass();
                });
                g.rule(|r| {
                    r.nt("simple_type_specifier");
                    r.pass();
                });
            })
            .seq_list("")
            .opt()
            .add_child()
            .avoid();
            r.group(|g| {
                g.rule(|r| {
                    r.group(|g| {
                        g.rule(|r| {
                            declarator_with_init(r);
                        });
                    })
                    .add_child();
                    r.ch_ws(';');
                    r.tree_from_list_tag(DECL);
                });
            })
            .add_child();
            r.tree_tag(DECLARATION);
        });
        // Function definitions and declarations with full type specifiers.
        nt.rule(|r| {
            r.group(|g| {
                g.rule(|r| {
                    r.nt("storage_class_specifier");
                    r.pass();
                });
                g.rule(|r| {
                    r.nt("type_specifier");
                    r.pass();
                });
            })
            .seq_list("")
            .opt()
            .add_child()
            .avoid();
            r.group(|g| {
                // New-style definition or forward declaration.
                g.rule(|r| {
                    r.nt("func_declarator");
                    r.ch_ws('(');
                    r.group(|g| {
                        g.rule(|r| {
                            r.nt_pass("parameter_declaration_list").opt();
                        });
                        g.rule(|r| {
                            r.keyword("void");
                            r.tree("void", "void");
                        });
                    })
                    .add_child();
                    r.ch_ws(')');
                    r.group(|g| {
                        g.rule(|r| {
                            r.ch_ws(';');
                            r.tree("forward", ";\n");
                        });
                        g.rule(|r| {
                            r.ch_ws('{');
                            r.nt("decl_or_stat");
                            r.ch_ws('}');
                            r.tree_tag(BODY);
                        });
                    })
                    .add_child();
                    r.tree("new_style", "%*(%*)\n%*");
                    r.ws();
                });
                // Old-style (K&R) definition.
                g.rule(|r| {
                    r.nt("func_declarator");
                    r.ch_ws('(');
                    r.nt("ident_list").opt();
                    r.ch_ws(')');
                    r.nt("declaration").seq_list("").opt();
                    r.ch_ws('{');
                    r.nt("decl_or_stat");
                    r.ch_ws('}');
                    r.tree("old_style", "%*(%*)\n%*{\n%>%*%<\n}\n\n");
                });
                // Plain declaration.
                g.rule(|r| {
                    r.group(|g| {
                        g.rule(|r| {
                            declarator_with_init(r);
                        });
                    })
                    .opt()
                    .add_child();
                    r.ch_ws(';');
                    r.tree_from_list_tag(DECL);
                });
            })
            .add_child();
            r.tree_tag(DECLARATION);
        });
    });

    b.nt("var_declaration", |nt| {
        nt.rule(|r| {
            r.group(|g| {
                g.rule(|r| {
                    r.nt("storage_class_specifier");
                    r.pass();
                });
                g.rule(|r| {
                    r.nt("type_specifier");
                    r.pass();
                });
            })
            .seq_list("")
            .opt()
            .add_child()
            .avoid();
            r.group(|g| {
                g.rule(|r| {
                    r.group(|g| {
                        g.rule(|r| {
                            declarator_with_init(r);
                        });
                    })
                    .opt()
                    .add_child();
                    r.ch_ws(';');
                    r.tree_tag(DECL);
                });
            })
            .add_child();
            r.tree_tag(DECLARATION);
        });
    });

    b.nt("storage_class_specifier", |nt| {
        for kw in ["typedef", "extern", "inline", "static", "auto", "task", "register"] {
            nt.rule(move |r| {
                r.keyword(kw);
                r.tree(storage_tag(kw), storage_tag(kw));
            });
        }
    });

    b.nt("simple_type_specifier", |nt| {
        for kw in [
            "char", "short", "int", "long", "signed", "unsigned", "float", "double", "const",
            "volatile", "void",
        ] {
            nt.rule(move |r| {
                r.keyword(kw);
                r.tree(kw_tag(kw), kw_tag(kw));
            });
        }
        nt.rule(|r| {
            r.ident();
            r.pass();
        });
    });

    b.nt("type_specifier", |nt| {
        for kw in [
            "char", "short", "int", "long", "signed", "unsigned", "float", "double", "const",
            "volatile", "void",
        ] {
            nt.rule(move |r| {
                r.keyword(kw);
                r.tree(kw_tag(kw), kw_tag(kw));
            });
        }
        nt.rule(|r| {
            r.nt("struct_or_union_specifier");
            r.pass();
        });
        nt.rule(|r| {
            r.nt("enum_specifier");
            r.pass();
        });
        nt.rule(|r| {
            r.ident();
            r.pass();
        });
    });

    for kw in ["struct", "union"] {
        b.nt("struct_or_union_specifier", move |nt| {
            nt.rule(move |r| {
                r.keyword(kw);
                r.ident_opt();
                r.group(|g| {
                    g.rule(|r| {
                        r.ch_ws('{');
                        r.group(|g| {
                            g.rule(|r| {
                                r.nt_pass("struct_declaration_or_anon");
                            });
                        })
                        .seq_list("")
                        .add_child();
                        r.ch_ws('}');
                        r.pass();
                    });
                })
                .opt()
                .add_child();
                r.tree(kw, struct_fmt(kw));
            });
        });
    }

    b.nt("struct_declaration_or_anon", |nt| {
        nt.rule(|r| {
            r.nt("struct_or_union_specifier");
            r.ch_ws(';');
            r.tree_from_list("semi", "%*;");
        });
        nt.rule(|r| {
            r.nt_pass("struct_declaration");
        });
    });

    b.nt("struct_declaration", |nt| {
        nt.rule(|r| {
            r.nt("type_specifier");
            r.nt("struct_declaration");
            r.tree("type", "%*%*");
        });
        nt.rule(|r| {
            r.nt("struct_declarator").seq_list(", ").chain(|c| {
                c.ch_ws(',');
            });
            r.ch_ws(';');
            r.tree("strdec", "%*;");
        });
    });

    b.nt("struct_declarator", |nt| {
        nt.rule(|r| {
            r.nt("declarator");
            r.group(|g| {
                g.rule(|r| {
                    r.ch_ws(':');
                    r.nt("constant_expr");
                    r.tree("fieldsize", " : %*");
                });
            })
            .opt()
            .add_child();
            r.tree("record_field", "%*%*");
        });
    });

    b.nt("enum_specifier", |nt| {
        nt.rule(|r| {
            r.keyword("enum");
            r.ident_opt();
            r.ch_ws('{');
            r.nt("enumerator").seq_list(", ").chain(|c| {
                c.ch_ws(',');
            });
            r.ch_ws('}');
            r.tree("enum", "enum %*{\n%*\n}");
        });
    });

    b.nt("enumerator", |nt| {
        nt.rule(|r| {
            r.ident();
            r.group(|g| {
                g.rule(|r| {
                    r.ch_ws('=');
                    r.nt("constant_expr");
                    r.tree("value", " = %*");
                });
            })
            .opt()
            .add_child();
            r.tree("enumerator", "%*%*");
        });
    });

    b.nt("func_declarator", |nt| {
        nt.rule(|r| {
            r.ch_ws('*');
            r.group(|g| {
                g.rule(|r| {
                    r.keyword("const");
                    r.tree("const", "const");
                });
            })
            .opt()
            .add_child();
            r.nt("func_declarator");
            r.tree("pointdecl", "*%*%*");
        });
        nt.rule(|r| {
            r.ch_ws('(');
            r.nt("func_declarator");
            r.ch_ws(')');
            r.tree("brackets", "(%*)");
        });
        nt.rule(|r| {
            r.ident();
            r.pass();
        });
    });

    b.nt("declarator", |nt| {
        nt.rule(|r| {
            r.ch_ws('*');
            r.group(|g| {
                g.rule(|r| {
                    r.keyword("const");
                    r.tree("const", "const");
                });
            })
            .opt()
            .add_child();
            r.nt("declarator");
            r.tree("pointdecl", "*%*%*");
        });
        nt.rule(|r| {
            r.ch_ws('(');
            r.nt("declarator");
            r.ch_ws(')');
            r.tree("brackets", "(%*)");
        });
        nt.rule(|r| {
            r.ws();
            r.ident();
            r.pass();
        });
        nt.rec_rule(|r| {
            r.ch_ws('[');
            r.nt("constant_expr").opt();
            r.ch_ws(']');
            r.tree("array", "%*[%*]");
        });
        nt.rec_rule(|r| {
            r.ch_ws('(');
            r.nt("abstract_declaration_list").opt();
            r.ch_ws(')');
            r.tree("function", "%*(%*)");
        });
    });

    b.nt("abstract_declaration_list", |nt| {
        nt.rule(|r| {
            r.nt("abstract_declaration")
                .seq_list(", ")
                .back_tracking()
                .chain(|c| {
                    c.ch_ws(',');
                });
            r.group(|g| {
                g.rule(|r| {
                    r.ch_ws(',');
                    r.ch('.');
                    r.ch('.');
                    r.ch_ws('.');
                    r.tree("varargs", ", ...");
                });
            })
            .opt()
            .add_child();
            r.tree("abstract_declaration_list", "%*%*");
        });
    });

    b.nt("parameter_declaration_list", |nt| {
        nt.rule(|r| {
            r.nt("parameter_declaration")
                .seq_list(", ")
                .back_tracking()
                .chain(|c| {
                    c.ch_ws(',');
                });
            r.group(|g| {
                g.rule(|r| {
                    r.ch_ws(',');
                    r.ch('.');
                    r.ch('.');
                    r.ch_ws('.');
                    r.tree("varargs", ", ...");
                });
            })
            .opt()
            .add_child();
            r.tree("parameter_declaration_list", "%*%*");
        });
    });

    b.nt("ident_list", |nt| {
        nt.rule(|r| {
            r.ident();
            r.group(|g| {
                g.rule(|r| {
                    r.ch_ws(',');
                    r.group(|g| {
                        g.rule(|r| {
                            r.ch('.');
                            r.ch('.');
                            r.ch_ws('.');
                            r.tree("varargs", ", ...");
                        });
                        g.rule(|r| {
                            r.nt("ident_list");
                            r.tree("ident_tail", ", %*");
                        });
                    })
                    .add_child();
                    r.pass();
                });
            })
            .opt()
            .add_child();
            r.tree("ident_list", "%*%*");
        });
    });

    b.nt("parameter_declaration", |nt| {
        nt.rule(|r| {
            r.nt("type_specifier");
            r.nt("parameter_declaration");
            r.tree("type", "%*%*");
        });
        nt.rule(|r| {
            r.nt_pass("declarator");
        });
        nt.rule(|r| {
            r.nt_pass("abstract_declarator");
        });
    });

    b.nt("abstract_declaration", |nt| {
        nt.rule(|r| {
            r.nt("type_specifier");
            r.nt("parameter_declaration");
            r.tree("type", "%*%*");
        });
        nt.rule(|r| {
            r.nt_pass("abstract_declarator");
        });
    });

    b.nt("abstract_declarator", |nt| {
        nt.rule(|r| {
            r.ch_ws('*');
            r.group(|g| {
                g.rule(|r| {
                    r.keyword("const");
                    r.tree("const", "const");
                });
            })
            .opt()
            .add_child();
            r.nt("abstract_declarator");
            r.tree("abs_pointdecl", "*%*%*");
        });
        nt.rule(|r| {
            r.ch_ws('(');
            r.nt("abstract_declarator");
            r.ch_ws(')');
            r.tree("abs_brackets", "(%*)");
        });
        nt.rule(|_r| {
            // An abstract declarator may be empty.
        });
        nt.rec_rule(|r| {
            r.ch_ws('[');
            r.nt("constant_expr").opt();
            r.ch_ws(']');
            r.tree("abs_array", "%*[%*]");
        });
        nt.rec_rule(|r| {
            r.ch_ws('(');
            r.nt("parameter_declaration_list");
            r.ch_ws(')');
            r.tree("abs_func", "%*(%*)");
        });
    });

    b.nt("initializer", |nt| {
        nt.rule(|r| {
            r.nt_pass("assignment_expr");
        });
        nt.rule(|r| {
            r.ch_ws('{');
            r.nt("initializer").seq_list(", ").chain(|c| {
                c.ch_ws(',');
            });
            r.ch(',').opt();
            r.ws();
            r.ch_ws('}');
            r.tree("initializer", "{%*}");
        });
    });
}

/// `declarator [= initializer]`, wrapped as a `decl_init` tree. Shared by
/// the three declaration forms.
fn declarator_with_init(r: &mut crate::grammar::RuleBuilder<'_, '_>) {
    r.nt("declarator");
    r.group(|g| {
        g.rule(|r| {
            r.ws();
            r.ch_ws('=');
            r.nt("initializer");
            r.tree_tag(INIT);
        });
    })
    .opt()
    .add_child();
    r.tree_tag(DECL_INIT);
}

fn storage_tag(kw: &str) -> &'static str {
    match kw {
        "typedef" => "typedef",
        "extern" => "extern",
        "inline" => "inline",
        "static" => "static",
        "auto" => "auto",
        "task" => "task",
        "register" => "register",
        other => panic!("not a storage class: {other}"),
    }
}

fn struct_fmt(kw: &str) -> &'static str {
    match kw {
        "struct" => "struct %*{\n%*\n}",
        "union" => "union %*{\n%*\n}",
        other => panic!("not a record keyword: {other}"),
    }
}

fn statements(b: &mut GrammarBuilder<'_>) {
    b.nt("decl_or_stat", |nt| {
        nt.rule(|r| {
            r.group(|g| {
                g.rule(|r| {
                    r.nt("statement");
                    r.pass();
                });
                g.rule(|r| {
                    r.nt("var_declaration");
                    r.pass();
                });
            })
            .seq_list("")
            .opt()
            .add_child();
            r.pass();
        });
    });

    b.nt("statement", |nt| {
        nt.rule(|r| {
            r.group(|g| {
                g.rule(|r| {
                    r.ident();
                    r.pass();
                });
                g.rule(|r| {
                    r.keyword("case");
                    r.nt("constant_expr");
                    r.tree("case", "case %*");
                });
                g.rule(|r| {
                    r.keyword("default");
                    r.tree("default", "default");
                });
            })
            .add_child();
            r.ch_ws(':');
            r.nt("statement");
            r.tree("label", "%*: %*");
        });
        nt.rule(|r| {
            r.ch_ws('{');
            r.nt("decl_or_stat");
            r.ch_ws('}');
            r.tree("statements", "%<{\n%>%*\n%<}%>");
        });
        nt.rule(|r| {
            r.nt("expr").opt();
            r.ch_ws(';');
            r.tree_from_list_tag(SEMI);
        });
        nt.rule(|r| {
            r.keyword("if");
            r.ws();
            r.ch_ws('(');
            r.nt("expr");
            r.ch_ws(')');
            r.nt("statement");
            r.group(|g| {
                g.rule(|r| {
                    r.keyword("else");
                    r.nt("statement");
                    r.tree("else", "\nelse\n%>%*%<");
                });
            })
            .opt()
            .add_child();
            r.tree("if", "if (%*)\n%>%*%<%*");
        });
        nt.rule(|r| {
            r.keyword("switch");
            r.ws();
            r.ch_ws('(');
            r.nt("expr");
            r.ch_ws(')');
            r.nt("statement");
            r.tree("switch", "switch (%*)%*");
        });
        nt.rule(|r| {
            r.keyword("while");
            r.ws();
            r.ch_ws('(');
            r.nt("expr");
            r.ch_ws(')');
            r.nt("statement");
            r.tree("while", "while (%*)%*");
        });
        nt.rule(|r| {
            r.keyword("do");
            r.nt("statement");
            r.keyword("while");
            r.ws();
            r.ch_ws('(');
            r.nt("expr");
            r.ch_ws(')');
            r.ch_ws(';');
            r.tree("do", "do%>%*%<\nwhile (%*);");
        });
        nt.rule(|r| {
            r.keyword("for");
            r.ws();
            r.ch_ws('(');
            r.nt("expr").opt();
            r.ch_ws(';');
            r.group(|g| {
                g.rule(|r| {
                    r.ws();
                    r.nt_pass("expr");
                });
            })
            .opt()
            .add_child();
            r.ch_ws(';');
            r.group(|g| {
                g.rule(|r| {
                    r.ws();
                    r.nt_pass("expr");
                });
            })
            .opt()
            .add_child();
            r.ch_ws(')');
            r.nt("statement");
            r.tree("for", "for (%*; %*; %*)\n%>%*%<");
        });
        nt.rule(|r| {
            r.keyword("goto");
            r.ident();
            r.ch_ws(';');
            r.tree("goto", "goto %*;");
        });
        nt.rule(|r| {
            r.keyword("continue");
            r.ch_ws(';');
            r.tree("cont", "continue;");
        });
        nt.rule(|r| {
            r.keyword("break");
            r.ch_ws(';');
            r.tree("break", "break;");
        });
        nt.rule(|r| {
            r.keyword("return");
            r.nt("expr").opt();
            r.ch_ws(';');
            r.tree("ret", "return%*;");
        });
        nt.rule(|r| {
            r.keyword("queue");
            r.ws();
            r.keyword("for");
            r.ws();
            r.nt("ident");
            r.ws();
            r.nt("statement");
            r.tree("queuefor", "queue for %*\n%>%*%<");
        });
        nt.rule(|r| {
            r.keyword("poll");
            r.ws();
            r.nt("statement");
            r.group(|g| {
                g.rule(|r| {
                    r.keyword("at");
                    r.ws();
                    r.keyword("most");
                    r.ws();
                    r.ch_ws('(');
                    r.nt("expr");
                    r.ch_ws(')');
                    r.nt("statement");
                    r.tree("atmost", "\nat most (%*)\n%>%*%<\n");
                });
            })
            .opt()
            .add_child();
            r.tree("poll", "poll\n%>%*%<%*");
        });
        nt.rule(|r| {
            r.keyword("timer");
            r.ws();
            r.nt("ident");
            r.ws();
            r.ch_ws(';');
            r.tree("timer", "timer %*;");
        });
        nt.rule(|r| {
            r.keyword("every");
            r.ws();
            r.ch_ws('(');
            r.nt("expr");
            r.ch_ws(')');
            r.keyword("start");
            r.ws();
            r.nt("ident");
            r.ws();
            r.ch_ws(';');
            r.tree("every", "every (%*) start %*;");
        });
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::Arena;
    use crate::parser::Parser;

    #[test]
    fn test_keywords_are_marked() {
        let mut interner = Interner::new();
        let _ = c_grammar(&mut interner);
        for kw in ["task", "queue", "for", "poll", "at", "most", "timer", "every", "start"] {
            let name = interner.intern(kw);
            assert!(interner.is_keyword(name), "{kw} should be a keyword");
        }
        let name = interner.intern("main");
        assert!(!interner.is_keyword(name));
    }

    #[test]
    fn test_expression_tree_shape() {
        let mut interner = Interner::new();
        let g = c_grammar(&mut interner);
        let mut arena = Arena::new();
        let mut parser = Parser::new(&g, b"a*b+c", &mut arena, &mut interner);
        let v = parser.parse("expr").expect("expression parses");
        assert!(arena.tree_is(v, "add"));
        let left = arena.tree_child(v, 1).unwrap();
        assert!(arena.tree_is(left, "times"));
    }

    #[test]
    fn test_statement_forms() {
        let mut interner = Interner::new();
        let g = c_grammar(&mut interner);
        for input in [
            &b"x = 1;"[..],
            b"{ x = 1; y = 2; }",
            b"if (x) y = 1; else y = 2;",
            b"while (x > 0) x = x - 1;",
            b"do x = x - 1; while (x);",
            b"for (i = 0; i < 10; i = i + 1) f(i);",
            b"return x + 1;",
            b"queue for q { x = 1; }",
            b"poll { x = 1; } at most (10) { y = 1; }",
            b"timer t1;",
            b"every (100) start tick;",
        ] {
            let mut arena = Arena::new();
            let mut parser = Parser::new(&g, input, &mut arena, &mut interner);
            parser.parse("statement").unwrap_or_else(|e| {
                panic!("statement {:?} should parse: {e}", std::str::from_utf8(input).unwrap())
            });
        }
    }

    #[test]
    fn test_declarations() {
        let mut interner = Interner::new();
        let g = c_grammar(&mut interner);
        for input in [
            &b"int x;"[..],
            b"int x = 5;",
            b"static unsigned count = 0;",
            b"int f(void) { return 1; }",
            b"void g(int a, int b) { a = b; }",
            b"task int f(void) { return 1; }",
            b"struct point { int x; int y; };",
            b"enum color { red, green = 3 };",
            b"int *p;",
            b"int a[10];",
        ] {
            let mut arena = Arena::new();
            let mut parser = Parser::new(&g, input, &mut arena, &mut interner);
            parser.parse("root").unwrap_or_else(|e| {
                panic!("declaration {:?} should parse: {e}", std::str::from_utf8(input).unwrap())
            });
        }
    }
}
