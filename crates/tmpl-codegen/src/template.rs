//! Source generation for compiled code.

use crate::builder::CodeBuilder;
use crate::context::CodegenContext;
use tmpl_compiler::Code;
use tmpl_expr::is_identifier;
use tmpl_runtime::{format_number, Value};

/// Generate source for one code node.
pub fn generate_code(builder: &mut CodeBuilder, code: &Code, ctx: &mut CodegenContext<'_>) {
    match code {
        Code::Text(text) => builder.push_str(&ctx.literal(text)),
        Code::Literal(value) => generate_value(builder, value, ctx),
        Code::Local(slot) => builder.push_str(&ctx.local(*slot)),
        Code::Ambient(name) => {
            builder.push_str("$lookup(");
            builder.push_str(&ctx.literal(name));
            builder.push(')');
        }
        Code::Data => builder.push_str("$data"),
        Code::Options => builder.push_str("$options"),
        Code::Array(items) => {
            builder.push('[');
            generate_list(builder, items, ctx);
            builder.push(']');
        }
        Code::Object(entries) => {
            builder.push('{');
            for (i, (key, value)) in entries.iter().enumerate() {
                if i > 0 {
                    builder.push_str(", ");
                }
                generate_key(builder, key, ctx);
                builder.push_str(": ");
                generate_code(builder, value, ctx);
            }
            builder.push('}');
        }
        Code::Member { object, property } => {
            generate_code(builder, object, ctx);
            if is_identifier(property) {
                builder.push('.');
                builder.push_str(property);
            } else {
                builder.push('[');
                builder.push_str(&ctx.literal(property));
                builder.push(']');
            }
        }
        Code::Index { object, index } => {
            generate_code(builder, object, ctx);
            builder.push('[');
            generate_code(builder, index, ctx);
            builder.push(']');
        }
        Code::Call { callee, args } => {
            generate_code(builder, callee, ctx);
            builder.push('(');
            generate_list(builder, args, ctx);
            builder.push(')');
        }
        Code::Unary { op, operand } => {
            builder.push_str(op.as_str());
            if matches!(**operand, Code::Unary { .. }) {
                builder.push('(');
                generate_code(builder, operand, ctx);
                builder.push(')');
            } else {
                generate_code(builder, operand, ctx);
            }
        }
        Code::Binary { op, lhs, rhs } => {
            builder.push('(');
            generate_code(builder, lhs, ctx);
            builder.push(' ');
            builder.push_str(op.as_str());
            builder.push(' ');
            generate_code(builder, rhs, ctx);
            builder.push(')');
        }
        Code::Conditional {
            test,
            consequent,
            alternate,
        } => {
            builder.push('(');
            generate_code(builder, test, ctx);
            builder.push_str(" ? ");
            generate_code(builder, consequent, ctx);
            builder.push_str(" : ");
            generate_code(builder, alternate, ctx);
            builder.push(')');
        }
        Code::Dethunk { temp, value } => {
            let temp = temp.to_string();
            builder.push_str("(typeof (");
            builder.push_str(&temp);
            builder.push_str(" = ");
            generate_code(builder, value, ctx);
            builder.push_str(") === \"function\" ? ");
            builder.push_str(&temp);
            builder.push_str(".call(this, $data, $options) : ");
            builder.push_str(&temp);
            builder.push(')');
        }
        Code::Each {
            buffer,
            key,
            value,
            container,
            body,
            ..
        } => {
            let buffer = buffer.to_string();
            builder.push_str("((");
            builder.push_str(&buffer);
            builder.push_str(" = []), $each(");
            generate_code(builder, container, ctx);
            builder.push_str(", function (");
            builder.push_str(key);
            builder.push_str(", ");
            builder.push_str(value);
            builder.push_str(") {");

            let marker = ctx.bind(key, value);
            builder.indent();
            builder.newline();
            builder.push_str(&buffer);
            builder.push_str(".push(");
            generate_code(builder, body, ctx);
            builder.push_str(");");
            builder.dedent();
            builder.newline();
            ctx.unbind(marker);

            builder.push_str("}), ");
            builder.push_str(&buffer);
            builder.push_str(".join(\"\"))");
        }
        Code::Invoke {
            data,
            options,
            selector,
            name,
        } => {
            builder.push_str("$tmpl(");
            generate_code(builder, data, ctx);
            builder.push_str(", ");
            generate_code(builder, options, ctx);
            builder.push_str(", ");
            match name {
                Some(name) => {
                    builder.push('(');
                    generate_code(builder, selector, ctx);
                    builder.push_str(" ?? ");
                    builder.push_str(&ctx.literal(name));
                    builder.push(')');
                }
                None => generate_code(builder, selector, ctx),
            }
            builder.push(')');
        }
        Code::Merge(sources) => {
            builder.push_str("$merge({}");
            for source in sources {
                builder.push_str(", ");
                generate_code(builder, source, ctx);
            }
            builder.push(')');
        }
    }
}

fn generate_list(builder: &mut CodeBuilder, items: &[Code], ctx: &mut CodegenContext<'_>) {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            builder.push_str(", ");
        }
        generate_code(builder, item, ctx);
    }
}

fn generate_key(builder: &mut CodeBuilder, key: &str, ctx: &CodegenContext<'_>) {
    if is_identifier(key) {
        builder.push_str(key);
    } else {
        builder.push_str(&ctx.literal(key));
    }
}

fn generate_value(builder: &mut CodeBuilder, value: &Value, ctx: &CodegenContext<'_>) {
    match value {
        Value::Undefined => builder.push_str("undefined"),
        Value::Null => builder.push_str("null"),
        Value::Bool(b) => builder.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => {
            let text = format_number(*n);
            if n.is_sign_negative() && *n != 0.0 {
                // keep `a - -1` from reading as `a --1`
                builder.push('(');
                builder.push_str(&text);
                builder.push(')');
            } else {
                builder.push_str(&text);
            }
        }
        Value::String(s) => builder.push_str(&ctx.literal(s)),
        Value::Array(items) => {
            builder.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    builder.push_str(", ");
                }
                generate_value(builder, item, ctx);
            }
            builder.push(']');
        }
        Value::Object(map) => {
            builder.push('{');
            for (i, (key, item)) in map.iter().enumerate() {
                if i > 0 {
                    builder.push_str(", ");
                }
                generate_key(builder, key, ctx);
                builder.push_str(": ");
                generate_value(builder, item, ctx);
            }
            builder.push('}');
        }
        Value::Function(function) => builder.push_str(function.name()),
    }
}
