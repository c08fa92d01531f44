//! Output formatting of individual columns.
//!
//! Specifiers follow the format-spec mini-language:
//! `[[fill]align][sign][#][0][width][,|_][.precision][type]`.
//! The type decides the coercion applied to the raw field before
//! formatting: `b c d o x X n` go through `int()`, `e E f F g G %` through
//! `float()`, anything else formats the string as is.

use spoon_core::spec::ColFormatDirective;
use spoon_core::value::{parse_float, parse_int};
use spoon_core::{Error, Result, Row};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Align {
    Left,
    Right,
    Center,
    /// Padding goes between the sign and the digits.
    AfterSign,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Sign {
    #[default]
    Minus,
    Plus,
    Space,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Str,
    Int(char),
    Float(char),
}

/// A parsed format specifier.
#[derive(Debug, Clone, PartialEq)]
pub struct FormatSpec {
    fill: Option<char>,
    align: Option<Align>,
    sign: Sign,
    alternate: bool,
    zero: bool,
    width: usize,
    grouping: Option<char>,
    precision: Option<usize>,
    kind: Kind,
}

fn invalid(spec: &str, why: &str) -> Error {
    Error::spec(format!("invalid format specifier {spec:?}: {why}"))
}

fn align_of(c: char) -> Option<Align> {
    match c {
        '<' => Some(Align::Left),
        '>' => Some(Align::Right),
        '^' => Some(Align::Center),
        '=' => Some(Align::AfterSign),
        _ => None,
    }
}

impl FormatSpec {
    pub fn parse(spec: &str) -> Result<Self> {
        let chars: Vec<char> = spec.chars().collect();
        let mut i = 0;
        let mut fill = None;
        let mut align = None;

        if chars.len() >= 2 && align_of(chars[1]).is_some() {
            fill = Some(chars[0]);
            align = align_of(chars[1]);
            i = 2;
        } else if let Some(a) = chars.first().copied().and_then(align_of) {
            align = Some(a);
            i = 1;
        }

        let mut sign = Sign::Minus;
        let mut explicit_sign = false;
        if let Some(&c) = chars.get(i) {
            let s = match c {
                '+' => Some(Sign::Plus),
                '-' => Some(Sign::Minus),
                ' ' => Some(Sign::Space),
                _ => None,
            };
            if let Some(s) = s {
                sign = s;
                explicit_sign = true;
                i += 1;
            }
        }

        let alternate = chars.get(i) == Some(&'#');
        if alternate {
            i += 1;
        }
        let zero = chars.get(i) == Some(&'0');
        if zero {
            i += 1;
        }

        let digits = |i: &mut usize| -> Option<usize> {
            let start = *i;
            while chars.get(*i).is_some_and(|c| c.is_ascii_digit()) {
                *i += 1;
            }
            if *i == start {
                None
            } else {
                chars[start..*i].iter().collect::<String>().parse().ok()
            }
        };
        let width = digits(&mut i).unwrap_or(0);

        let grouping = match chars.get(i) {
            Some(&c @ (',' | '_')) => {
                i += 1;
                Some(c)
            }
            _ => None,
        };

        let precision = if chars.get(i) == Some(&'.') {
            i += 1;
            Some(digits(&mut i).ok_or_else(|| invalid(spec, "format specifier missing precision"))?)
        } else {
            None
        };

        let kind = match &chars[i..] {
            [] | ['s'] => Kind::Str,
            [c @ ('b' | 'c' | 'd' | 'o' | 'x' | 'X' | 'n')] => Kind::Int(*c),
            [c @ ('e' | 'E' | 'f' | 'F' | 'g' | 'G' | '%')] => Kind::Float(*c),
            [c] => return Err(invalid(spec, &format!("unknown format code '{c}'"))),
            _ => return Err(invalid(spec, "invalid format specifier")),
        };

        match kind {
            Kind::Str => {
                if explicit_sign {
                    return Err(invalid(spec, "sign not allowed in string format specifier"));
                }
                if alternate {
                    return Err(invalid(spec, "alternate form (#) not allowed in string format specifier"));
                }
                if align == Some(Align::AfterSign) {
                    return Err(invalid(spec, "'=' alignment not allowed in string format specifier"));
                }
                if let Some(g) = grouping {
                    return Err(invalid(spec, &format!("cannot specify '{g}' with 's'")));
                }
            }
            Kind::Int(c) => {
                if precision.is_some() {
                    return Err(invalid(spec, "precision not allowed in integer format specifier"));
                }
                if c == 'c' && explicit_sign {
                    return Err(invalid(spec, "sign not allowed with integer format specifier 'c'"));
                }
                if grouping == Some(',') && c != 'd' {
                    return Err(invalid(spec, &format!("cannot specify ',' with '{c}'")));
                }
                if grouping == Some('_') && matches!(c, 'c' | 'n') {
                    return Err(invalid(spec, &format!("cannot specify '_' with '{c}'")));
                }
            }
            Kind::Float(_) => {}
        }

        Ok(Self {
            fill,
            align,
            sign,
            alternate,
            zero,
            width,
            grouping,
            precision,
            kind,
        })
    }

    /// Whether formatting leaves every value untouched.
    pub fn is_passthrough(&self) -> bool {
        self.kind == Kind::Str
            && self.width == 0
            && self.precision.is_none()
    }

    /// Coerce `raw` as the type code requires, then format it.
    pub fn format(&self, raw: &str) -> Result<String> {
        match self.kind {
            Kind::Str => Ok(self.format_str(raw)),
            Kind::Int(code) => {
                let n = coerce_int(raw)?;
                self.format_int(n, code)
            }
            Kind::Float(code) => {
                let x = parse_float(raw).ok_or_else(|| {
                    Error::eval(format!("could not convert string to float: '{raw}'"))
                })?;
                Ok(self.format_float(x, code))
            }
        }
    }

    fn format_str(&self, raw: &str) -> String {
        let body: String = match self.precision {
            Some(p) => raw.chars().take(p).collect(),
            None => raw.to_string(),
        };
        let fill = self.fill.unwrap_or(if self.zero { '0' } else { ' ' });
        pad("", &body, self.width, fill, self.align.unwrap_or(Align::Left))
    }

    fn sign_str(&self, negative: bool) -> &'static str {
        match (negative, self.sign) {
            (true, _) => "-",
            (false, Sign::Plus) => "+",
            (false, Sign::Space) => " ",
            (false, Sign::Minus) => "",
        }
    }

    fn format_int(&self, n: i64, code: char) -> Result<String> {
        if code == 'c' {
            let ch = u32::try_from(n)
                .ok()
                .and_then(char::from_u32)
                .ok_or_else(|| Error::eval("%c arg not in range(0x110000)"))?;
            let fill = self.fill.unwrap_or(' ');
            return Ok(pad("", &ch.to_string(), self.width, fill, self.align.unwrap_or(Align::Right)));
        }
        let abs = n.unsigned_abs();
        let (digits, prefix, group_size) = match code {
            'b' => (format!("{abs:b}"), "0b", 4),
            'o' => (format!("{abs:o}"), "0o", 4),
            'x' => (format!("{abs:x}"), "0x", 4),
            'X' => (format!("{abs:X}"), "0X", 4),
            _ => (abs.to_string(), "", 3),
        };
        let prefix = if self.alternate { prefix } else { "" };
        let lead = format!("{}{}", self.sign_str(n < 0), prefix);
        Ok(self.finish_number(&lead, &digits, "", group_size))
    }

    fn format_float(&self, x: f64, code: char) -> String {
        let negative = x.is_sign_negative() && !x.is_nan();
        let abs = x.abs();
        let upper = matches!(code, 'E' | 'F' | 'G');
        let precision = self.precision.unwrap_or(6);

        let (body, suffix) = if !abs.is_finite() {
            let text = if abs.is_nan() { "nan" } else { "inf" };
            let text = if upper { text.to_uppercase() } else { text.to_string() };
            (text, if code == '%' { "%" } else { "" })
        } else {
            match code {
                'f' | 'F' => (fixed(abs, precision, self.alternate), ""),
                'e' | 'E' => (exponent(abs, precision, self.alternate, upper), ""),
                'g' | 'G' => (general(abs, precision, self.alternate, upper), ""),
                _ => (fixed(abs * 100.0, precision, self.alternate), "%"),
            }
        };

        let lead = self.sign_str(negative);
        let (int_part, frac) = match body.find(|c: char| !c.is_ascii_digit()) {
            Some(pos) => body.split_at(pos),
            None => (body.as_str(), ""),
        };
        let tail = format!("{frac}{suffix}");
        self.finish_number(lead, int_part, &tail, 3)
    }

    /// Group the integer digits, then pad the whole number.
    fn finish_number(&self, lead: &str, digits: &str, tail: &str, group_size: usize) -> String {
        let zero_pad = self.fill.is_none() && self.align.is_none() && self.zero;
        let (fill, align) = if zero_pad {
            ('0', Align::AfterSign)
        } else {
            (self.fill.unwrap_or(' '), self.align.unwrap_or(Align::Right))
        };

        let Some(sep) = self.grouping else {
            return pad(lead, &format!("{digits}{tail}"), self.width, fill, align);
        };
        let mut digits = digits.to_string();
        let mut grouped = group(&digits, sep, group_size);
        if zero_pad {
            // Zero padding is inserted as digits so separators run through it.
            let lead_len = lead.chars().count();
            while lead_len + grouped.chars().count() + tail.chars().count() < self.width {
                digits.insert(0, '0');
                grouped = group(&digits, sep, group_size);
            }
        }
        pad(lead, &format!("{grouped}{tail}"), self.width, fill, align)
    }
}

fn coerce_int(raw: &str) -> Result<i64> {
    if let Some(n) = parse_int(raw) {
        return Ok(n);
    }
    match parse_float(raw) {
        Some(x) if x.is_finite() && x.trunc().abs() < 9.223_372_036_854_776e18 => {
            Ok(x.trunc() as i64)
        }
        _ => Err(Error::eval(format!(
            "invalid literal for int() with base 10: '{raw}'"
        ))),
    }
}

fn pad(lead: &str, body: &str, width: usize, fill: char, align: Align) -> String {
    let len = lead.chars().count() + body.chars().count();
    if len >= width {
        return format!("{lead}{body}");
    }
    let n = width - len;
    let fill_str = |k: usize| std::iter::repeat(fill).take(k).collect::<String>();
    match align {
        Align::Left => format!("{lead}{body}{}", fill_str(n)),
        Align::Right => format!("{}{lead}{body}", fill_str(n)),
        Align::Center => format!("{}{lead}{body}{}", fill_str(n / 2), fill_str(n - n / 2)),
        Align::AfterSign => format!("{lead}{}{body}", fill_str(n)),
    }
}

fn group(digits: &str, sep: char, size: usize) -> String {
    let chars: Vec<char> = digits.chars().collect();
    let mut out = String::with_capacity(chars.len() + chars.len() / size);
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && (chars.len() - i) % size == 0 {
            out.push(sep);
        }
        out.push(*c);
    }
    out
}

fn fixed(x: f64, precision: usize, alternate: bool) -> String {
    let s = format!("{x:.precision$}");
    if alternate && precision == 0 {
        format!("{s}.")
    } else {
        s
    }
}

/// `d.ddde+XX` with at least two exponent digits.
fn exponent(x: f64, precision: usize, alternate: bool, upper: bool) -> String {
    let s = format!("{x:.precision$e}");
    let (mantissa, exp) = s.split_once('e').unwrap_or((s.as_str(), "0"));
    let mut mantissa = mantissa.to_string();
    if alternate && precision == 0 {
        mantissa.push('.');
    }
    let exp: i32 = exp.parse().unwrap_or(0);
    let e = if upper { 'E' } else { 'e' };
    let sign = if exp < 0 { '-' } else { '+' };
    format!("{mantissa}{e}{sign}{:02}", exp.abs())
}

fn strip_zeros(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

/// `g` presentation: fixed or exponent depending on the decimal exponent.
fn general(x: f64, precision: usize, alternate: bool, upper: bool) -> String {
    let p = precision.max(1);
    let exp = if x == 0.0 {
        0
    } else {
        let s = format!("{:.*e}", p - 1, x);
        s.split_once('e')
            .and_then(|(_, e)| e.parse::<i32>().ok())
            .unwrap_or(0)
    };
    if -4 <= exp && exp < p as i32 {
        let decimals = (p as i32 - 1 - exp).max(0) as usize;
        let s = format!("{x:.decimals$}");
        if alternate {
            if s.contains('.') {
                s
            } else {
                format!("{s}.")
            }
        } else {
            strip_zeros(&s).to_string()
        }
    } else {
        let s = exponent(x, p - 1, alternate, upper);
        if alternate {
            return s;
        }
        let e = if upper { 'E' } else { 'e' };
        match s.split_once(e) {
            Some((mantissa, rest)) => format!("{}{e}{rest}", strip_zeros(mantissa)),
            None => s,
        }
    }
}

/// A format bound to one column, applied to rows right before writing.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnFormat {
    column: String,
    spec: FormatSpec,
}

impl ColumnFormat {
    pub fn new(column: impl Into<String>, spec: &str) -> Result<Self> {
        Ok(Self {
            column: column.into(),
            spec: FormatSpec::parse(spec)?,
        })
    }

    pub fn from_directive(directive: &ColFormatDirective) -> Result<Self> {
        Self::new(directive.column.clone(), &directive.format)
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    /// Rewrite the column in `row`; an absent column is a schema error.
    pub fn apply(&self, row: &mut Row) -> Result<()> {
        let field = row
            .get_mut(&self.column)
            .ok_or_else(|| Error::ColumnNotFound(self.column.clone()))?;
        if !self.spec.is_passthrough() {
            *field = self.spec.format(field)?;
        }
        Ok(())
    }
}
