//! Flattened devicetree blob access.
//!
//! The blob is borrowed, never copied. Nodes are identified by the offset of
//! their `FDT_BEGIN_NODE` token inside the structure block, the same handle
//! libfdt uses, so a [`Node`] stays valid for as long as the blob does.

use gicmap_lib::{ByteCursor, klog_debug};

use crate::error::{FdtError, FdtResult};

pub const FDT_MAGIC: u32 = 0xd00d_feed;
pub const FDT_HEADER_LEN: usize = 40;

const FDT_BEGIN_NODE: u32 = 0x1;
const FDT_END_NODE: u32 = 0x2;
const FDT_PROP: u32 = 0x3;
const FDT_NOP: u32 = 0x4;
const FDT_END: u32 = 0x9;

/// Oldest layout this parser reads (adds `size_dt_strings`).
const FDT_FIRST_SUPPORTED_VERSION: u32 = 16;
const FDT_LAST_SUPPORTED_VERSION: u32 = 17;

/// Deepest nesting `parent` can track without allocation.
const FDT_MAX_DEPTH: usize = 32;

const DEFAULT_ADDRESS_CELLS: u32 = 2;
const DEFAULT_SIZE_CELLS: u32 = 1;
const DEFAULT_INTERRUPT_CELLS: u32 = 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FdtHeader {
    pub magic: u32,
    pub totalsize: u32,
    pub off_dt_struct: u32,
    pub off_dt_strings: u32,
    pub off_mem_rsvmap: u32,
    pub version: u32,
    pub last_comp_version: u32,
    pub boot_cpuid_phys: u32,
    pub size_dt_strings: u32,
    pub size_dt_struct: u32,
}

impl FdtHeader {
    fn parse(blob: &[u8]) -> FdtResult<Self> {
        let mut cur = ByteCursor::new(blob);
        let magic = cur.read_u32_be()?;
        if magic != FDT_MAGIC {
            return Err(FdtError::BadMagic { found: magic });
        }
        let totalsize = cur.read_u32_be()?;
        let off_dt_struct = cur.read_u32_be()?;
        let off_dt_strings = cur.read_u32_be()?;
        let off_mem_rsvmap = cur.read_u32_be()?;
        let version = cur.read_u32_be()?;
        let last_comp_version = cur.read_u32_be()?;
        if version < FDT_FIRST_SUPPORTED_VERSION || last_comp_version > FDT_LAST_SUPPORTED_VERSION
        {
            return Err(FdtError::UnsupportedVersion {
                version,
                last_compatible: last_comp_version,
            });
        }
        let boot_cpuid_phys = cur.read_u32_be()?;
        let size_dt_strings = cur.read_u32_be()?;
        // Version 16 headers stop before size_dt_struct.
        let size_dt_struct = if version >= 17 {
            cur.read_u32_be()?
        } else {
            totalsize.saturating_sub(off_dt_struct)
        };
        Ok(Self {
            magic,
            totalsize,
            off_dt_struct,
            off_dt_strings,
            off_mem_rsvmap,
            version,
            last_comp_version,
            boot_cpuid_phys,
            size_dt_strings,
            size_dt_struct,
        })
    }
}

/// Cut `[offset, offset + size)` out of `blob`, or report which block is bad.
fn block<'a>(blob: &'a [u8], offset: u32, size: u32, what: &'static str) -> FdtResult<&'a [u8]> {
    let start = offset as usize;
    let end = start
        .checked_add(size as usize)
        .ok_or(FdtError::BadHeader { what })?;
    blob.get(start..end).ok_or(FdtError::BadHeader { what })
}

/// Handle to a node: the offset of its `FDT_BEGIN_NODE` token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Node(usize);

impl Node {
    #[inline]
    pub fn offset(self) -> usize {
        self.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Token<'a> {
    BeginNode { node: Node, name: &'a [u8] },
    EndNode,
    Prop { name: &'a [u8], value: &'a [u8] },
}

/// Validated view of a devicetree blob.
#[derive(Clone, Copy, Debug)]
pub struct Fdt<'a> {
    header: FdtHeader,
    structs: &'a [u8],
    strings: &'a [u8],
}

impl<'a> Fdt<'a> {
    pub fn new(blob: &'a [u8]) -> FdtResult<Self> {
        let header = FdtHeader::parse(blob)?;
        let total = header.totalsize as usize;
        if total < FDT_HEADER_LEN {
            return Err(FdtError::BadHeader { what: "totalsize" });
        }
        if total > blob.len() {
            return Err(FdtError::Truncated { offset: blob.len() });
        }
        let blob = &blob[..total];
        let structs = block(
            blob,
            header.off_dt_struct,
            header.size_dt_struct,
            "structure block",
        )?;
        let strings = block(
            blob,
            header.off_dt_strings,
            header.size_dt_strings,
            "strings block",
        )?;
        klog_debug!(
            "DT: blob v{} size {:#x}, struct {:#x}+{:#x}",
            header.version,
            header.totalsize,
            header.off_dt_struct,
            header.size_dt_struct
        );
        Ok(Self {
            header,
            structs,
            strings,
        })
    }

    #[inline]
    pub fn header(&self) -> &FdtHeader {
        &self.header
    }

    /// Walk tokens starting at `offset` in the structure block.
    pub fn tokens_from(&self, offset: usize) -> FdtResult<Tokens<'a>> {
        Ok(Tokens {
            cur: ByteCursor::at(self.structs, offset)?,
            strings: self.strings,
            done: false,
        })
    }

    pub fn tokens(&self) -> Tokens<'a> {
        Tokens {
            cur: ByteCursor::new(self.structs),
            strings: self.strings,
            done: false,
        }
    }

    /// The first node in the structure block.
    pub fn root(&self) -> FdtResult<Node> {
        for token in self.tokens() {
            if let Token::BeginNode { node, .. } = token? {
                return Ok(node);
            }
        }
        Err(FdtError::BadValue {
            what: "missing root node",
        })
    }

    fn begin_at(&self, node: Node) -> FdtResult<(&'a [u8], Tokens<'a>)> {
        let mut tokens = self.tokens_from(node.0)?;
        match tokens.next() {
            Some(Ok(Token::BeginNode { name, .. })) => Ok((name, tokens)),
            Some(Err(err)) => Err(err),
            _ => Err(FdtError::BadValue {
                what: "node handle",
            }),
        }
    }

    pub fn node_name(&self, node: Node) -> FdtResult<&'a [u8]> {
        self.begin_at(node).map(|(name, _)| name)
    }

    /// Properties of `node` itself, in blob order.
    pub fn properties(&self, node: Node) -> FdtResult<Properties<'a>> {
        let (_, tokens) = self.begin_at(node)?;
        Ok(Properties { tokens })
    }

    pub fn property(&self, node: Node, name: &str) -> FdtResult<Option<&'a [u8]>> {
        for prop in self.properties(node)? {
            let (prop_name, value) = prop?;
            if prop_name == name.as_bytes() {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }

    /// Read a single-cell property; `None` when absent.
    pub fn property_u32(&self, node: Node, name: &'static str) -> FdtResult<Option<u32>> {
        match self.property(node, name)? {
            None => Ok(None),
            Some(value) => ByteCursor::new(value)
                .read_u32_be()
                .map(Some)
                .map_err(|_| FdtError::BadValue { what: name }),
        }
    }

    pub fn parent(&self, node: Node) -> FdtResult<Option<Node>> {
        let mut stack = [Node(0); FDT_MAX_DEPTH];
        let mut depth = 0usize;
        for token in self.tokens() {
            match token? {
                Token::BeginNode { node: current, .. } => {
                    if current == node {
                        return Ok(depth.checked_sub(1).map(|d| stack[d]));
                    }
                    if depth == FDT_MAX_DEPTH {
                        return Err(FdtError::TooDeep);
                    }
                    stack[depth] = current;
                    depth += 1;
                }
                Token::EndNode => depth = depth.saturating_sub(1),
                Token::Prop { .. } => {}
            }
        }
        Err(FdtError::BadValue {
            what: "node handle",
        })
    }

    /// Next node after `after` (or from the start) whose property `name`
    /// matches `pred`.
    fn next_node_where<F>(&self, after: Option<Node>, name: &str, pred: F) -> FdtResult<Option<Node>>
    where
        F: Fn(&[u8]) -> bool,
    {
        for token in self.tokens() {
            let Token::BeginNode { node, .. } = token? else {
                continue;
            };
            if after.is_some_and(|after| node <= after) {
                continue;
            }
            if self.property(node, name)?.is_some_and(&pred) {
                return Ok(Some(node));
            }
        }
        Ok(None)
    }

    /// Document-order search for a node listing `compatible`.
    pub fn node_by_compatible(
        &self,
        after: Option<Node>,
        compatible: &str,
    ) -> FdtResult<Option<Node>> {
        self.next_node_where(after, "compatible", |list| {
            stringlist_contains(list, compatible)
        })
    }

    /// Document-order search for a node whose string property `name` equals
    /// `value`.
    pub fn node_by_prop_value(
        &self,
        after: Option<Node>,
        name: &str,
        value: &str,
    ) -> FdtResult<Option<Node>> {
        self.next_node_where(after, name, |prop| {
            prop.strip_suffix(&[0]).unwrap_or(prop) == value.as_bytes()
        })
    }

    pub fn address_cells(&self, node: Node) -> FdtResult<u32> {
        Ok(self
            .property_u32(node, "#address-cells")?
            .unwrap_or(DEFAULT_ADDRESS_CELLS))
    }

    pub fn size_cells(&self, node: Node) -> FdtResult<u32> {
        Ok(self
            .property_u32(node, "#size-cells")?
            .unwrap_or(DEFAULT_SIZE_CELLS))
    }

    pub fn interrupt_cells(&self, node: Node) -> FdtResult<u32> {
        Ok(self
            .property_u32(node, "#interrupt-cells")?
            .unwrap_or(DEFAULT_INTERRUPT_CELLS))
    }
}

/// True when the NUL-separated `list` contains `s` as a whole entry.
pub fn stringlist_contains(list: &[u8], s: &str) -> bool {
    list.split(|&b| b == 0).any(|item| item == s.as_bytes())
}

pub struct Tokens<'a> {
    cur: ByteCursor<'a>,
    strings: &'a [u8],
    done: bool,
}

impl<'a> Tokens<'a> {
    fn read_token(&mut self) -> FdtResult<Option<Token<'a>>> {
        loop {
            let offset = self.cur.position();
            let tag = self.cur.read_u32_be()?;
            match tag {
                FDT_BEGIN_NODE => {
                    let name = self.cur.read_cstr()?;
                    self.cur.align(4)?;
                    return Ok(Some(Token::BeginNode {
                        node: Node(offset),
                        name,
                    }));
                }
                FDT_END_NODE => return Ok(Some(Token::EndNode)),
                FDT_PROP => {
                    let len = self.cur.read_u32_be()? as usize;
                    let name_off = self.cur.read_u32_be()? as usize;
                    let value = self.cur.read_bytes(len)?;
                    self.cur.align(4)?;
                    let name = ByteCursor::at(self.strings, name_off)?.read_cstr()?;
                    return Ok(Some(Token::Prop { name, value }));
                }
                FDT_NOP => continue,
                FDT_END => return Ok(None),
                token => return Err(FdtError::BadToken { token, offset }),
            }
        }
    }
}

impl<'a> Iterator for Tokens<'a> {
    type Item = FdtResult<Token<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let token = self.read_token();
        if !matches!(token, Ok(Some(_))) {
            self.done = true;
        }
        token.transpose()
    }
}

/// Properties of one node; stops at its first child or its end.
pub struct Properties<'a> {
    tokens: Tokens<'a>,
}

impl<'a> Iterator for Properties<'a> {
    type Item = FdtResult<(&'a [u8], &'a [u8])>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.tokens.next()? {
            Ok(Token::Prop { name, value }) => Some(Ok((name, value))),
            Ok(_) => {
                self.tokens.done = true;
                None
            }
            Err(err) => Some(Err(err)),
        }
    }
}
