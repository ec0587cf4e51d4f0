//! Type descriptor and generic signature parsing
//!
//! Both grammars are handled by one recursive-descent parser, since plain
//! descriptors are a subset of the signature grammar. The parser only
//! collects the class names a descriptor or signature mentions; nested
//! generic types are expressed in JVM form (`Outer<T>.Inner` becomes
//! `Outer$Inner`).

use super::ClassFileError;

/// Class names referenced by a field or method descriptor
pub fn descriptor_classes(descriptor: &str) -> Result<Vec<String>, ClassFileError> {
    SignatureParser::new(descriptor).parse()
}

/// Class names referenced by a class, method or field generic signature
pub fn signature_classes(signature: &str) -> Result<Vec<String>, ClassFileError> {
    SignatureParser::new(signature).parse()
}

/// Element class of a constant-pool class name.
///
/// Plain names are returned as-is; array names (`[[Ltest/Foo;`) yield their
/// element class, and primitive arrays yield None.
pub fn element_class(name: &str) -> Option<String> {
    if !name.starts_with('[') {
        return Some(name.to_string());
    }
    let element = name.trim_start_matches('[');
    element
        .strip_prefix('L')
        .and_then(|rest| rest.strip_suffix(';'))
        .map(str::to_string)
}

struct SignatureParser<'a> {
    input: &'a str,
    bytes: &'a [u8],
    pos: usize,
    classes: Vec<String>,
}

impl<'a> SignatureParser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            bytes: input.as_bytes(),
            pos: 0,
            classes: Vec::new(),
        }
    }

    fn parse(mut self) -> Result<Vec<String>, ClassFileError> {
        if self.bytes.is_empty() {
            return Err(self.error());
        }
        if self.peek() == Some(b'<') {
            self.type_parameters()?;
        }
        if self.peek() == Some(b'(') {
            self.method_signature()?;
        } else {
            // Field type, or a class signature's superclass followed by interfaces
            while self.pos < self.bytes.len() {
                self.type_signature()?;
            }
        }
        if self.pos != self.bytes.len() {
            return Err(self.error());
        }
        Ok(self.classes)
    }

    fn method_signature(&mut self) -> Result<(), ClassFileError> {
        self.expect(b'(')?;
        while self.peek() != Some(b')') {
            self.type_signature()?;
        }
        self.expect(b')')?;
        if self.peek() == Some(b'V') {
            self.pos += 1;
        } else {
            self.type_signature()?;
        }
        while self.peek() == Some(b'^') {
            self.pos += 1;
            self.type_signature()?;
        }
        Ok(())
    }

    fn type_parameters(&mut self) -> Result<(), ClassFileError> {
        self.expect(b'<')?;
        while self.peek() != Some(b'>') {
            self.identifier(b":")?;
            self.expect(b':')?;
            // Class bound may be empty when only interface bounds follow
            if matches!(self.peek(), Some(b'L' | b'T' | b'[')) {
                self.type_signature()?;
            }
            while self.peek() == Some(b':') {
                self.pos += 1;
                self.type_signature()?;
            }
        }
        self.expect(b'>')
    }

    fn type_signature(&mut self) -> Result<(), ClassFileError> {
        match self.peek() {
            Some(b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z') => {
                self.pos += 1;
                Ok(())
            }
            Some(b'[') => {
                self.pos += 1;
                self.type_signature()
            }
            Some(b'T') => {
                self.pos += 1;
                self.identifier(b";")?;
                self.expect(b';')
            }
            Some(b'L') => self.class_type(),
            _ => Err(self.error()),
        }
    }

    fn class_type(&mut self) -> Result<(), ClassFileError> {
        self.expect(b'L')?;
        // The named class comes before its type arguments; inner segments rename it in place
        let slot = self.classes.len();
        let mut name = self.identifier(b"<.;")?.to_string();
        self.classes.push(name.clone());
        if self.peek() == Some(b'<') {
            self.type_arguments()?;
        }
        while self.peek() == Some(b'.') {
            self.pos += 1;
            let inner = self.identifier(b"<.;")?;
            name.push('$');
            name.push_str(inner);
            self.classes[slot] = name.clone();
            if self.peek() == Some(b'<') {
                self.type_arguments()?;
            }
        }
        self.expect(b';')
    }

    fn type_arguments(&mut self) -> Result<(), ClassFileError> {
        self.expect(b'<')?;
        while self.peek() != Some(b'>') {
            match self.peek() {
                Some(b'*') => self.pos += 1,
                Some(b'+' | b'-') => {
                    self.pos += 1;
                    self.type_signature()?;
                }
                _ => self.type_signature()?,
            }
        }
        self.expect(b'>')
    }

    /// Consume a non-empty run of bytes up to (not including) any terminator
    fn identifier(&mut self, terminators: &[u8]) -> Result<&'a str, ClassFileError> {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if terminators.contains(&b) {
                break;
            }
            self.pos += 1;
        }
        if self.pos == start || self.pos >= self.bytes.len() {
            return Err(self.error());
        }
        Ok(&self.input[start..self.pos])
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn expect(&mut self, expected: u8) -> Result<(), ClassFileError> {
        if self.peek() == Some(expected) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error())
        }
    }

    fn error(&self) -> ClassFileError {
        ClassFileError::BadDescriptor {
            value: self.input.to_string(),
        }
    }
}
