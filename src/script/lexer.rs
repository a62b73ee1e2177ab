//! Tokenizer for script source

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Name(String),
    Integer(i64),
    Float(f64),
    Str(String),

    Function,
    End,
    Return,
    Local,
    If,
    Then,
    Elseif,
    Else,
    True,
    False,
    Nil,
    Not,

    LParen,
    RParen,
    Comma,
    Assign,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Concat,
    Hash,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,

    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Name(name) => return write!(f, "'{}'", name),
            Self::Integer(value) => return write!(f, "'{}'", value),
            Self::Float(value) => return write!(f, "'{}'", value),
            Self::Str(text) => return write!(f, "'\"{}\"'", text),
            Self::Function => "function",
            Self::End => "end",
            Self::Return => "return",
            Self::Local => "local",
            Self::If => "if",
            Self::Then => "then",
            Self::Elseif => "elseif",
            Self::Else => "else",
            Self::True => "true",
            Self::False => "false",
            Self::Nil => "nil",
            Self::Not => "not",
            Self::LParen => "(",
            Self::RParen => ")",
            Self::Comma => ",",
            Self::Assign => "=",
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Star => "*",
            Self::Slash => "/",
            Self::Percent => "%",
            Self::Concat => "..",
            Self::Hash => "#",
            Self::Eq => "==",
            Self::Ne => "~=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Eof => return write!(f, "<eof>"),
        };
        write!(f, "'{}'", text)
    }
}

/// Token with the line it starts on
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    pub line: usize,
    pub message: String,
}

pub struct Lexer<'s> {
    chars: std::iter::Peekable<std::str::Chars<'s>>,
    line: usize,
}

impl<'s> Lexer<'s> {
    pub fn new(source: &'s str) -> Self {
        Self {
            chars: source.chars().peekable(),
            line: 1,
        }
    }

    pub fn tokenize(mut self) -> Result<Vec<Spanned>, LexError> {
        let mut tokens = Vec::new();
        loop {
            self.skip_trivia();
            let line = self.line;
            let token = self.next_token()?;
            let done = token == Token::Eof;
            tokens.push(Spanned { token, line });
            if done {
                return Ok(tokens);
            }
        }
    }

    fn error(&self, message: impl Into<String>) -> LexError {
        LexError {
            line: self.line,
            message: message.into(),
        }
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.chars.peek() == Some(&expected) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.chars.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('-') => {
                    let mut ahead = self.chars.clone();
                    ahead.next();
                    if ahead.peek() != Some(&'-') {
                        return;
                    }
                    while let Some(c) = self.chars.peek() {
                        if *c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                _ => return,
            }
        }
    }

    fn next_token(&mut self) -> Result<Token, LexError> {
        let c = match self.bump() {
            Some(c) => c,
            None => return Ok(Token::Eof),
        };

        let token = match c {
            '(' => Token::LParen,
            ')' => Token::RParen,
            ',' => Token::Comma,
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Star,
            '/' => Token::Slash,
            '%' => Token::Percent,
            '#' => Token::Hash,
            '=' => if self.eat('=') { Token::Eq } else { Token::Assign },
            '<' => if self.eat('=') { Token::Le } else { Token::Lt },
            '>' => if self.eat('=') { Token::Ge } else { Token::Gt },
            '~' => {
                if self.eat('=') {
                    Token::Ne
                } else {
                    return Err(self.error("unexpected symbol near '~'"));
                }
            }
            '.' => {
                if self.eat('.') {
                    Token::Concat
                } else if matches!(self.chars.peek(), Some(d) if d.is_ascii_digit()) {
                    return self.number('.');
                } else {
                    return Err(self.error("unexpected symbol near '.'"));
                }
            }
            '"' | '\'' => return self.string(c),
            c if c.is_ascii_digit() => return self.number(c),
            c if c.is_alphabetic() || c == '_' => self.word(c),
            other => return Err(self.error(format!("unexpected symbol near '{}'", other))),
        };
        Ok(token)
    }

    fn word(&mut self, first: char) -> Token {
        let mut word = String::from(first);
        while let Some(&c) = self.chars.peek() {
            if c.is_alphanumeric() || c == '_' {
                word.push(c);
                self.bump();
            } else {
                break;
            }
        }

        match word.as_str() {
            "function" => Token::Function,
            "end" => Token::End,
            "return" => Token::Return,
            "local" => Token::Local,
            "if" => Token::If,
            "then" => Token::Then,
            "elseif" => Token::Elseif,
            "else" => Token::Else,
            "true" => Token::True,
            "false" => Token::False,
            "nil" => Token::Nil,
            "not" => Token::Not,
            _ => Token::Name(word),
        }
    }

    fn number(&mut self, first: char) -> Result<Token, LexError> {
        let mut text = String::from(first);

        if first == '0' && matches!(self.chars.peek(), Some('x') | Some('X')) {
            self.bump();
            let mut digits = String::new();
            while let Some(&c) = self.chars.peek() {
                if c.is_ascii_hexdigit() {
                    digits.push(c);
                    self.bump();
                } else {
                    break;
                }
            }
            return u64::from_str_radix(&digits, 16)
                .map(|value| Token::Integer(value as i64))
                .map_err(|_| self.error(format!("malformed number near '0x{}'", digits)));
        }

        let mut is_float = first == '.';
        while let Some(&c) = self.chars.peek() {
            if c.is_ascii_digit() {
                text.push(c);
            } else if c == '.' && !is_float {
                let mut ahead = self.chars.clone();
                ahead.next();
                if ahead.peek() == Some(&'.') {
                    break;
                }
                is_float = true;
                text.push(c);
            } else if c == 'e' || c == 'E' {
                is_float = true;
                text.push(c);
                self.bump();
                if let Some(&sign) = self.chars.peek() {
                    if sign == '+' || sign == '-' {
                        text.push(sign);
                        self.bump();
                    }
                }
                continue;
            } else {
                break;
            }
            self.bump();
        }

        if !is_float {
            if let Ok(value) = text.parse::<i64>() {
                return Ok(Token::Integer(value));
            }
        }
        text.parse::<f64>()
            .map(Token::Float)
            .map_err(|_| self.error(format!("malformed number near '{}'", text)))
    }

    fn string(&mut self, quote: char) -> Result<Token, LexError> {
        let mut text = String::new();
        loop {
            match self.bump() {
                None | Some('\n') => return Err(self.error("unfinished string")),
                Some(c) if c == quote => return Ok(Token::Str(text)),
                Some('\\') => {
                    let escaped = match self.bump() {
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some('r') => '\r',
                        Some('0') => '\0',
                        Some('\\') => '\\',
                        Some('"') => '"',
                        Some('\'') => '\'',
                        Some(other) => {
                            return Err(self.error(format!("invalid escape sequence '\\{}'", other)))
                        }
                        None => return Err(self.error("unfinished string")),
                    };
                    text.push(escaped);
                }
                Some(c) => text.push(c),
            }
        }
    }
}
